//! Part registry - the single source of truth for every part in a run
//!
//! Every part reference coming out of a report, the platform table or the
//! target list goes through [`PartGroup::get_or_create`], so a part number
//! always resolves to one [`Part`].

use miette::Diagnostic;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::core::identity::{PartNumber, PartNumberError, PartSpec, DEFAULT_MIN_DIGITS};
use crate::core::obsolescence::{self, HierarchyError};
use crate::entities::part::{Part, PartKind};

/// One "part is used in parent" fact taken from a report row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    pub part_number: String,
    pub description: String,
    pub parent_part_number: String,
    pub parent_description: String,
}

/// The set of all parts known in one run
#[derive(Debug, Clone)]
pub struct PartGroup {
    parts: BTreeMap<PartNumber, Part>,
    targets: BTreeSet<PartNumber>,
    report_parts: BTreeSet<PartNumber>,
    report_universe: BTreeSet<PartNumber>,
    min_digits: usize,
}

impl Default for PartGroup {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DIGITS)
    }
}

impl PartGroup {
    /// Create an empty registry validating part numbers with `min_digits`
    pub fn new(min_digits: usize) -> Self {
        Self {
            parts: BTreeMap::new(),
            targets: BTreeSet::new(),
            report_parts: BTreeSet::new(),
            report_universe: BTreeSet::new(),
            min_digits,
        }
    }

    pub fn min_digits(&self) -> usize {
        self.min_digits
    }

    /// Validate a raw part number against this registry's digit bound
    pub fn parse_number(&self, number: &str) -> Result<PartNumber, PartNumberError> {
        PartNumber::parse(number, self.min_digits)
    }

    /// Resolve a part number to its single instance, creating it if needed
    ///
    /// An existing part with an empty name picks up `name`.
    pub fn get_or_create(&mut self, number: &str, name: &str) -> Result<PartNumber, RegistryError> {
        let number = self.parse_number(number)?;
        self.get_or_create_number(number.clone(), name);
        Ok(number)
    }

    fn get_or_create_number(&mut self, number: PartNumber, name: &str) -> &mut Part {
        self.parts
            .entry(number)
            .and_modify(|part| {
                if part.set_name_if_empty(name) {
                    tracing::debug!(part = %part.number(), name, "backfilled part name");
                }
            })
            .or_insert_with_key(|number| {
                tracing::trace!(part = %number, "registered part");
                Part::standard(number.clone(), name.trim())
            })
    }

    /// Look up a part by validated number
    pub fn part(&self, number: &PartNumber) -> Option<&Part> {
        self.parts.get(number)
    }

    /// Look up a part by raw string
    pub fn get_part(&self, number: &str) -> Option<&Part> {
        self.parts.get(number.trim().to_uppercase().as_str())
    }

    pub fn contains(&self, number: &str) -> bool {
        self.get_part(number).is_some()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn is_platform(&self, number: &str) -> bool {
        self.get_part(number).is_some_and(Part::is_platform)
    }

    /// Record that `child` is used in `parent`
    pub fn add_parent(&mut self, child: &PartNumber, parent: &PartNumber) -> Result<bool, RegistryError> {
        if !self.parts.contains_key(parent) {
            return Err(RegistryError::UnknownPart(parent.clone()));
        }
        let part = self
            .parts
            .get_mut(child)
            .ok_or_else(|| RegistryError::UnknownPart(child.clone()))?;
        if part.is_platform() {
            return Err(RegistryError::PlatformHasParents {
                platform: child.clone(),
                parent: parent.clone(),
            });
        }
        Ok(part.add_parent(parent.clone()))
    }

    /// Check a report row without touching the registry
    pub fn validate_usage(&self, row: &UsageRow) -> Result<(PartNumber, PartNumber), RegistryError> {
        let child = self.parse_number(&row.part_number)?;
        let parent = self.parse_number(&row.parent_part_number)?;

        if self.part(&child).is_some_and(Part::is_platform) {
            return Err(RegistryError::PlatformHasParents {
                platform: child,
                parent,
            });
        }
        Ok((child, parent))
    }

    /// Ingest one report row
    ///
    /// Both numbers are validated and the platform rule is checked before
    /// anything is inserted, so a bad row leaves the registry untouched.
    pub fn add_usage(&mut self, row: &UsageRow) -> Result<(), RegistryError> {
        let (child, parent) = self.validate_usage(row)?;

        self.get_or_create_number(child.clone(), &row.description);
        self.get_or_create_number(parent.clone(), &row.parent_description);
        self.report_universe.insert(child.clone());
        self.report_universe.insert(parent.clone());
        self.add_parent(&child, &parent)?;
        Ok(())
    }

    /// Note that a report mentioned this part without giving it a parent
    pub fn touch_from_report(&mut self, number: &str, name: &str) -> Result<PartNumber, RegistryError> {
        let number = self.get_or_create(number, name)?;
        self.report_universe.insert(number.clone());
        Ok(number)
    }

    /// Load platforms from a `"<number>-<description>" -> can_obsolete` table
    pub fn import_platforms(&mut self, table: &BTreeMap<String, bool>) -> Result<usize, RegistryError> {
        // Validate the whole table first so a bad entry inserts nothing
        let mut specs: Vec<(PartSpec, bool)> = Vec::with_capacity(table.len());
        for (key, can_obsolete) in table {
            let spec = PartSpec::parse(key, self.min_digits)?;
            if let Some(existing) = self.part(&spec.number) {
                match existing.kind() {
                    PartKind::Platform { can_obsolete: current } if current != *can_obsolete => {
                        return Err(RegistryError::PlatformStatusChange {
                            platform: spec.number,
                            current,
                        });
                    }
                    PartKind::Standard { .. } if !existing.parents().is_empty() => {
                        return Err(RegistryError::PlatformConflict(spec.number));
                    }
                    _ => {}
                }
            }
            // The same platform listed twice must agree with itself
            if let Some((_, current)) = specs.iter().find(|(s, _)| s.number == spec.number) {
                if current != can_obsolete {
                    return Err(RegistryError::PlatformStatusChange {
                        platform: spec.number,
                        current: *current,
                    });
                }
            }
            specs.push((spec, *can_obsolete));
        }

        let count = specs.len();
        for (spec, can_obsolete) in specs {
            match self.parts.get_mut(&spec.number) {
                Some(part) => {
                    part.set_name_if_empty(&spec.description);
                    if !part.is_platform() {
                        part.promote_to_platform(can_obsolete);
                    }
                }
                None => {
                    let part = Part::platform(spec.number.clone(), spec.description, can_obsolete);
                    self.parts.insert(spec.number, part);
                }
            }
        }
        tracing::debug!(count, "imported platforms");
        Ok(count)
    }

    /// Add target parts from `<number>` or `<number>-<description>` specs
    ///
    /// Returns how many new targets were added.
    pub fn register_target_parts<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<usize, RegistryError> {
        let parsed = specs
            .iter()
            .map(|s| PartSpec::parse(s.as_ref(), self.min_digits))
            .collect::<Result<Vec<_>, _>>()?;

        let mut added = 0;
        for spec in parsed {
            self.get_or_create_number(spec.number.clone(), &spec.description);
            if self.targets.insert(spec.number) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Fail if another report already describes `number`
    ///
    /// A part not yet in the registry has no report, so it passes.
    pub fn check_report_claim(&self, number: &PartNumber, report_ref: &str) -> Result<(), RegistryError> {
        match self.part(number).and_then(Part::source_report) {
            Some(existing) if existing != report_ref => Err(RegistryError::DuplicateReport {
                part: number.clone(),
                existing: existing.to_string(),
                duplicate: report_ref.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Mark `number` as the subject of report `report_ref`
    pub fn claim_report(&mut self, number: &PartNumber, report_ref: &str) -> Result<(), RegistryError> {
        self.check_report_claim(number, report_ref)?;
        let part = self
            .parts
            .get_mut(number)
            .ok_or_else(|| RegistryError::UnknownPart(number.clone()))?;
        if part.source_report().is_none() {
            part.set_source_report(report_ref);
        }

        self.report_parts.insert(number.clone());
        self.report_universe.insert(number.clone());
        Ok(())
    }

    /// Fail if `number` cannot be marked as an orphan
    pub fn check_orphan(&self, number: &PartNumber) -> Result<(), RegistryError> {
        let part = self
            .part(number)
            .ok_or_else(|| RegistryError::UnknownPart(number.clone()))?;
        if part.is_platform() {
            return Err(RegistryError::PlatformOrphan(number.clone()));
        }
        if !part.parents().is_empty() {
            return Err(RegistryError::OrphanHasParents(number.clone()));
        }
        Ok(())
    }

    /// Record a confirmed empty where-used result
    pub fn set_orphan(&mut self, number: &PartNumber) -> Result<(), RegistryError> {
        self.check_orphan(number)?;
        if let Some(part) = self.parts.get_mut(number) {
            part.set_orphan();
        }
        Ok(())
    }

    /// All parts, optionally without platforms, in part-number order
    pub fn parts(&self, omit_platforms: bool) -> Vec<&Part> {
        self.parts
            .values()
            .filter(|p| !(omit_platforms && p.is_platform()))
            .collect()
    }

    pub fn target_parts(&self) -> Vec<&Part> {
        self.targets.iter().filter_map(|n| self.parts.get(n)).collect()
    }

    pub fn target_numbers(&self) -> &BTreeSet<PartNumber> {
        &self.targets
    }

    pub fn report_parts(&self) -> Vec<&Part> {
        self.report_parts.iter().filter_map(|n| self.parts.get(n)).collect()
    }

    pub fn has_report(&self, number: &PartNumber) -> bool {
        self.report_parts.contains(number)
    }

    pub fn report_count(&self) -> usize {
        self.report_parts.len()
    }

    /// Whether any ingested report mentioned this part
    pub fn in_report_universe(&self, number: &PartNumber) -> bool {
        self.report_universe.contains(number)
    }

    /// Transitive ancestors of a part
    ///
    /// Platforms are included but not expanded. Cycles are tolerated: each
    /// part is visited once.
    pub fn ancestors(&self, number: &PartNumber) -> BTreeSet<PartNumber> {
        let mut found = BTreeSet::new();
        let mut stack: Vec<&PartNumber> = match self.parts.get(number) {
            Some(part) => part.parents().iter().collect(),
            None => return found,
        };

        while let Some(current) = stack.pop() {
            if !found.insert(current.clone()) {
                continue;
            }
            if let Some(part) = self.parts.get(current) {
                if !part.is_terminal() {
                    stack.extend(part.parents().iter());
                }
            }
        }
        found
    }

    /// Non-platform assemblies anywhere above a part
    pub fn assemblies_above(&self, number: &PartNumber) -> Vec<&Part> {
        self.ancestors(number)
            .iter()
            .filter_map(|n| self.parts.get(n))
            .filter(|p| !p.is_platform())
            .collect()
    }

    /// Platforms a part is ultimately used on
    pub fn platform_applications(&self, number: &PartNumber) -> Vec<&Part> {
        let mut platforms: Vec<&Part> = self
            .ancestors(number)
            .iter()
            .filter_map(|n| self.parts.get(n))
            .filter(|p| p.is_platform())
            .collect();
        if let Some(part) = self.parts.get(number).filter(|p| p.is_platform()) {
            platforms.insert(0, part);
        }
        platforms
    }

    /// Whether a part can be obsoleted; recomputed on every call
    pub fn obsolescence_status(&self, number: &PartNumber) -> Result<bool, RegistryError> {
        Ok(obsolescence::obsolescence_status(self, number)?)
    }
}

/// Parse a newline-delimited target list; blank lines and `#` comments are skipped
pub fn parse_target_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Errors raised while building or querying a [`PartGroup`]
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidPartNumber(#[from] PartNumberError),

    #[error("part {0} is not in the registry")]
    #[diagnostic(code(whereused::registry::unknown_part))]
    UnknownPart(PartNumber),

    #[error("platform {platform} cannot be used in {parent}")]
    #[diagnostic(
        code(whereused::registry::platform_parent),
        help("platforms are roots of the hierarchy; check the platform table")
    )]
    PlatformHasParents { platform: PartNumber, parent: PartNumber },

    #[error("{0} is already used in other assemblies and cannot become a platform")]
    #[diagnostic(code(whereused::registry::platform_conflict))]
    PlatformConflict(PartNumber),

    #[error("platform {platform} is already imported with can-obsolete = {current}")]
    #[diagnostic(
        code(whereused::registry::platform_status),
        help("a platform's status is fixed once imported; check for duplicate platform entries")
    )]
    PlatformStatusChange { platform: PartNumber, current: bool },

    #[error("platform {0} cannot be marked as an orphan")]
    #[diagnostic(code(whereused::registry::platform_orphan))]
    PlatformOrphan(PartNumber),

    #[error("{0} has parents and cannot be marked as an orphan")]
    #[diagnostic(code(whereused::registry::orphan_has_parents))]
    OrphanHasParents(PartNumber),

    #[error("two reports found for {part}: '{existing}' and '{duplicate}'")]
    #[diagnostic(
        code(whereused::registry::duplicate_report),
        help("remove one of the reports from the report directory and run again")
    )]
    DuplicateReport {
        part: PartNumber,
        existing: String,
        duplicate: String,
    },

    #[error("no reports have been ingested")]
    #[diagnostic(
        code(whereused::registry::no_reports),
        help("export reports into the project's report directory first")
    )]
    NoReportsIngested,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hierarchy(#[from] HierarchyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(part: &str, desc: &str, parent: &str, parent_desc: &str) -> UsageRow {
        UsageRow {
            part_number: part.to_string(),
            description: desc.to_string(),
            parent_part_number: parent.to_string(),
            parent_description: parent_desc.to_string(),
        }
    }

    fn platforms(entries: &[(&str, bool)]) -> BTreeMap<String, bool> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_get_or_create_single_instance() {
        let mut group = PartGroup::default();
        let first = group.get_or_create("614575", "").unwrap();
        let second = group.get_or_create("614575", "BRACKET").unwrap();
        let third = group.get_or_create("614575", "SOMETHING ELSE").unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(group.len(), 1);
        // Earlier handles observe the backfill
        assert_eq!(group.part(&first).unwrap().name(), "BRACKET");
    }

    #[test]
    fn test_get_or_create_rejects_short_number() {
        let mut group = PartGroup::default();
        let err = group.get_or_create("1234", "").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPartNumber(_)));
        assert!(group.is_empty());
    }

    #[test]
    fn test_add_usage_links_parent() {
        let mut group = PartGroup::default();
        group.add_usage(&row("614575", "BRACKET", "637381", "FRAME ASSY")).unwrap();
        group.add_usage(&row("614575", "BRACKET", "637381", "FRAME ASSY")).unwrap();

        let part = group.get_part("614575").unwrap();
        assert_eq!(part.parents().len(), 1);
        assert!(part.get_parent("637381").is_some());
        assert_eq!(group.get_part("637381").unwrap().name(), "FRAME ASSY");
    }

    #[test]
    fn test_add_usage_validates_before_insert() {
        let mut group = PartGroup::default();
        let err = group.add_usage(&row("614575", "BRACKET", "12", "BAD")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPartNumber(_)));
        assert!(group.is_empty());
    }

    #[test]
    fn test_platform_cannot_take_parent() {
        let mut group = PartGroup::default();
        group.import_platforms(&platforms(&[("666111-PLATFORM LWB", true)])).unwrap();

        let err = group.add_usage(&row("666111", "", "637381", "")).unwrap_err();
        assert!(matches!(err, RegistryError::PlatformHasParents { .. }));
        assert!(!group.contains("637381"));
    }

    #[test]
    fn test_import_platforms_splits_key() {
        let mut group = PartGroup::default();
        let count = group
            .import_platforms(&platforms(&[("666111-PLATFORM-LWB", true), ("666222-SWB", false)]))
            .unwrap();
        assert_eq!(count, 2);

        let lwb = group.get_part("666111").unwrap();
        assert!(lwb.is_platform());
        assert_eq!(lwb.name(), "PLATFORM-LWB");
        assert!(group.is_platform("666222"));
    }

    #[test]
    fn test_import_platforms_promotes_bare_part() {
        let mut group = PartGroup::default();
        group.register_target_parts(&["666111"]).unwrap();
        group.import_platforms(&platforms(&[("666111-LWB", false)])).unwrap();
        assert!(group.is_platform("666111"));
        assert_eq!(group.get_part("666111").unwrap().name(), "LWB");
    }

    #[test]
    fn test_import_platforms_conflict() {
        let mut group = PartGroup::default();
        group.add_usage(&row("666111", "", "637381", "")).unwrap();
        let err = group.import_platforms(&platforms(&[("666111-LWB", false)])).unwrap_err();
        assert!(matches!(err, RegistryError::PlatformConflict(_)));
    }

    #[test]
    fn test_import_platforms_keeps_status() {
        let mut group = PartGroup::default();
        group.import_platforms(&platforms(&[("666111-LWB", false)])).unwrap();

        let err = group.import_platforms(&platforms(&[("666111-LWB", true)])).unwrap_err();
        assert!(matches!(err, RegistryError::PlatformStatusChange { current: false, .. }));
        assert!(!group.obsolescence_status(group.get_part("666111").unwrap().number()).unwrap());

        let mut fresh = PartGroup::default();
        let err = fresh
            .import_platforms(&platforms(&[("666222-SWB", true), ("666222-SWB REV2", false)]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::PlatformStatusChange { .. }));
        assert!(fresh.is_empty());

        // Re-importing the same status is harmless
        group.import_platforms(&platforms(&[("666111-LWB", false)])).unwrap();
        assert!(group.is_platform("666111"));
    }

    #[test]
    fn test_register_target_parts_dedupes() {
        let mut group = PartGroup::default();
        let added = group
            .register_target_parts(&["614575", "614575-BRACKET", "637381-FRAME"])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(group.target_parts().len(), 2);
        assert_eq!(group.get_part("614575").unwrap().name(), "BRACKET");

        // Report rows resolve to the same object
        group.add_usage(&row("614575", "", "637381", "")).unwrap();
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_register_target_parts_all_or_nothing() {
        let mut group = PartGroup::default();
        assert!(group.register_target_parts(&["614575", "12"]).is_err());
        assert!(group.is_empty());
    }

    #[test]
    fn test_parse_target_list() {
        let text = "# targets\n614575\n\n  637381-FRAME  \n#637999\n";
        assert_eq!(parse_target_list(text), vec!["614575", "637381-FRAME"]);
    }

    #[test]
    fn test_claim_report_duplicate() {
        let mut group = PartGroup::default();
        let pn = group.get_or_create("614575", "").unwrap();
        group.claim_report(&pn, "a.csv").unwrap();
        group.claim_report(&pn, "a.csv").unwrap();

        let err = group.claim_report(&pn, "b.csv").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateReport { .. }));
        assert_eq!(group.get_part("614575").unwrap().source_report(), Some("a.csv"));
        assert_eq!(group.report_count(), 1);
    }

    #[test]
    fn test_set_orphan_policy() {
        let mut group = PartGroup::default();
        group.add_usage(&row("614575", "", "637381", "")).unwrap();
        let child = group.parse_number("614575").unwrap();
        let parent = group.parse_number("637381").unwrap();

        let err = group.set_orphan(&child).unwrap_err();
        assert!(matches!(err, RegistryError::OrphanHasParents(_)));

        group.set_orphan(&parent).unwrap();
        assert!(group.part(&parent).unwrap().is_orphan());
    }

    #[test]
    fn test_ancestors_stop_at_platforms() {
        let mut group = PartGroup::default();
        group.import_platforms(&platforms(&[("666111-LWB", true)])).unwrap();
        group.add_usage(&row("100001", "", "200001", "")).unwrap();
        group.add_usage(&row("200001", "", "300001", "")).unwrap();
        group.add_usage(&row("300001", "", "666111", "")).unwrap();

        let pn = group.parse_number("100001").unwrap();
        let ancestors: Vec<String> = group.ancestors(&pn).iter().map(|n| n.to_string()).collect();
        assert_eq!(ancestors, vec!["200001", "300001", "666111"]);

        let assemblies: Vec<String> = group.assemblies_above(&pn).iter().map(|p| p.to_string()).collect();
        assert_eq!(assemblies, vec!["200001", "300001"]);

        let apps: Vec<String> = group.platform_applications(&pn).iter().map(|p| p.to_string()).collect();
        assert_eq!(apps, vec!["666111"]);
    }

    #[test]
    fn test_ancestors_tolerate_cycles() {
        let mut group = PartGroup::default();
        group.add_usage(&row("100001", "", "200001", "")).unwrap();
        group.add_usage(&row("200001", "", "100001", "")).unwrap();

        let pn = group.parse_number("100001").unwrap();
        assert_eq!(group.ancestors(&pn).len(), 2);
    }

    #[test]
    fn test_parts_omit_platforms() {
        let mut group = PartGroup::default();
        group.import_platforms(&platforms(&[("666111-LWB", true)])).unwrap();
        group.add_usage(&row("100001", "", "666111", "")).unwrap();

        assert_eq!(group.parts(false).len(), 2);
        assert_eq!(group.parts(true).len(), 1);
    }
}
