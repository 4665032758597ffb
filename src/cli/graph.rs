//! GraphViz DOT export of the usage hierarchy
//!
//! Edges point from a part to each assembly it is used in, with parents drawn
//! above their children. Nodes are coloured by obsolescence status:
//! green when the part can be obsoleted, red when something still needs it.

use std::collections::BTreeSet;

use crate::cli::helpers::{escape_dot, truncate_str};
use crate::core::identity::PartNumber;
use crate::core::registry::{PartGroup, RegistryError};
use crate::entities::part::Part;

const CAN_OBSOLETE_FILL: &str = "#C6EFCE";
const CAN_OBSOLETE_FONT: &str = "#006100";
const IN_USE_FILL: &str = "#FFC7CE";
const IN_USE_FONT: &str = "#9C0006";

/// Which parts appear in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphScope {
    /// Target parts and everything above them
    Targets,
    /// Every part in the registry
    All,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    /// Part numbers only, no descriptions
    pub compact: bool,
    /// Outline colours only, for printing
    pub printout: bool,
    /// Leave out already-obsolete and orphaned parts that are not targets
    pub exclude_obs: bool,
}

fn node_set(group: &PartGroup, scope: GraphScope, options: &GraphOptions) -> BTreeSet<PartNumber> {
    let mut nodes: BTreeSet<PartNumber> = match scope {
        GraphScope::All => group.parts(false).iter().map(|p| p.number().clone()).collect(),
        GraphScope::Targets => group
            .target_numbers()
            .iter()
            .flat_map(|t| std::iter::once(t.clone()).chain(group.ancestors(t)))
            .collect(),
    };

    if options.exclude_obs {
        let targets = group.target_numbers();
        nodes.retain(|n| {
            targets.contains(n)
                || group
                    .part(n)
                    .map_or(true, |p| !(p.obsolescence_disposition() || p.is_orphan()))
        });
    }
    nodes
}

fn node_attributes(part: &Part, can_obsolete: bool, is_target: bool, options: &GraphOptions) -> String {
    let label = if options.compact || part.name().is_empty() {
        escape_dot(part.number().as_str())
    } else {
        format!(
            "{}\\n{}",
            escape_dot(part.number().as_str()),
            escape_dot(&truncate_str(part.name(), 30))
        )
    };

    let mut styles = Vec::new();
    let mut attrs = vec![format!("label=\"{}\"", label)];
    attrs.push(format!("shape={}", if part.is_platform() { "box" } else { "ellipse" }));

    if options.printout {
        if !can_obsolete {
            styles.push("bold");
            attrs.push(format!("color=\"{}\"", IN_USE_FONT));
        }
    } else {
        styles.push("filled");
        let (fill, font) = if can_obsolete {
            (CAN_OBSOLETE_FILL, CAN_OBSOLETE_FONT)
        } else {
            (IN_USE_FILL, IN_USE_FONT)
        };
        attrs.push(format!("fillcolor=\"{}\"", fill));
        attrs.push(format!("fontcolor=\"{}\"", font));
    }
    if part.is_orphan() {
        styles.push("dashed");
    }
    if is_target {
        attrs.push("penwidth=3".to_string());
    }
    if !styles.is_empty() {
        attrs.push(format!("style=\"{}\"", styles.join(",")));
    }
    attrs.join(", ")
}

/// Render the hierarchy as a DOT digraph
///
/// Fails when a part's status cannot be resolved, e.g. on a usage cycle.
pub fn render_dot(group: &PartGroup, scope: GraphScope, options: &GraphOptions) -> Result<String, RegistryError> {
    let nodes = node_set(group, scope, options);
    let targets = group.target_numbers();

    let mut out = String::new();
    out.push_str("digraph whereused {\n");
    out.push_str("  rankdir=BT;\n");
    out.push_str("  node [fontname=\"Helvetica\"];\n");
    out.push('\n');

    for number in &nodes {
        let part = group
            .part(number)
            .ok_or_else(|| RegistryError::UnknownPart(number.clone()))?;
        let can_obsolete = group.obsolescence_status(number)?;
        out.push_str(&format!(
            "  \"{}\" [{}];\n",
            escape_dot(number.as_str()),
            node_attributes(part, can_obsolete, targets.contains(number), options)
        ));
    }
    out.push('\n');

    for number in &nodes {
        let Some(part) = group.part(number) else { continue };
        for parent in part.parents().iter().filter(|p| nodes.contains(*p)) {
            out.push_str(&format!(
                "  \"{}\" -> \"{}\";\n",
                escape_dot(number.as_str()),
                escape_dot(parent.as_str())
            ));
        }
    }
    out.push_str("}\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::UsageRow;
    use std::collections::BTreeMap;

    fn usage(part: &str, desc: &str, parent: &str) -> UsageRow {
        UsageRow {
            part_number: part.to_string(),
            description: desc.to_string(),
            parent_part_number: parent.to_string(),
            parent_description: String::new(),
        }
    }

    fn group() -> PartGroup {
        let mut group = PartGroup::default();
        let platforms: BTreeMap<String, bool> = [("666111-LWB".to_string(), true)].into_iter().collect();
        group.import_platforms(&platforms).unwrap();
        group.add_usage(&usage("100001", "BOLT \"M8\"", "200001")).unwrap();
        group.add_usage(&usage("200001", "BRACKET ASSY", "666111")).unwrap();
        group.get_or_create("400001", "OBS-OLD FRAME").unwrap();
        group.add_usage(&usage("100001", "", "300001")).unwrap();
        group.add_usage(&usage("300001", "", "400001")).unwrap();
        group.register_target_parts(&["100001"]).unwrap();
        group
    }

    #[test]
    fn test_render_targets_scope() {
        let group = group();
        let dot = render_dot(&group, GraphScope::Targets, &GraphOptions::default()).unwrap();

        assert!(dot.starts_with("digraph whereused {"));
        assert!(dot.contains("\"100001\" -> \"200001\";"));
        assert!(dot.contains("\"200001\" -> \"666111\";"));
        assert!(dot.contains("\"300001\" -> \"400001\";"));
        assert!(dot.contains("BOLT \\\"M8\\\""));
        assert!(dot.contains(CAN_OBSOLETE_FILL));
        assert!(dot.contains("penwidth=3"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_exclude_obs_drops_obsolete_parents() {
        let group = group();
        let options = GraphOptions {
            exclude_obs: true,
            ..Default::default()
        };
        let dot = render_dot(&group, GraphScope::Targets, &options).unwrap();
        assert!(!dot.contains("\"400001\""));
        assert!(dot.contains("\"300001\""));
    }

    #[test]
    fn test_compact_printout() {
        let group = group();
        let options = GraphOptions {
            compact: true,
            printout: true,
            ..Default::default()
        };
        let dot = render_dot(&group, GraphScope::All, &options).unwrap();
        assert!(!dot.contains("BRACKET ASSY"));
        assert!(!dot.contains("fillcolor"));
        assert!(dot.contains("\"666111\" [label=\"666111\", shape=box"));
    }

    #[test]
    fn test_cycle_is_an_error() {
        let mut group = PartGroup::default();
        group.add_usage(&usage("100001", "", "200001")).unwrap();
        group.add_usage(&usage("200001", "", "100001")).unwrap();
        let err = render_dot(&group, GraphScope::All, &GraphOptions::default()).unwrap_err();
        assert!(matches!(err, RegistryError::Hierarchy(_)));
    }
}
