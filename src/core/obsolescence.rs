//! Obsolescence propagation over the usage hierarchy
//!
//! A part can be obsoleted when every assembly it is used in can be
//! obsoleted. Platforms carry an external status and end the recursion; parts
//! whose name already marks them obsolete short-circuit to `true`.

use miette::Diagnostic;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::identity::PartNumber;
use crate::core::registry::PartGroup;
use crate::entities::part::PartKind;

/// Resolve whether `number` can be obsoleted
///
/// Nothing is cached: the status is recomputed from the current graph on each
/// call, so results reflect any reports ingested since the last query.
///
/// Fails with [`HierarchyError::Cyclic`] when the part is reached again
/// through its own ancestors.
pub fn obsolescence_status(group: &PartGroup, number: &PartNumber) -> Result<bool, HierarchyError> {
    let mut chain = Vec::new();
    let mut resolved = BTreeMap::new();
    resolve(group, number, &mut chain, &mut resolved)
}

/// `resolved` holds the statuses settled during this call, so shared
/// ancestors are walked once.
fn resolve(
    group: &PartGroup,
    number: &PartNumber,
    chain: &mut Vec<PartNumber>,
    resolved: &mut BTreeMap<PartNumber, bool>,
) -> Result<bool, HierarchyError> {
    if let Some(&status) = resolved.get(number) {
        return Ok(status);
    }

    let part = group
        .part(number)
        .ok_or_else(|| HierarchyError::UnknownPart(number.clone()))?;

    match part.kind() {
        PartKind::Platform { can_obsolete } => return Ok(can_obsolete),
        PartKind::Standard {
            obsolescence_disposition: true,
        } => return Ok(true),
        PartKind::Standard { .. } => {}
    }

    if let Some(start) = chain.iter().position(|n| n == number) {
        let mut cycle: Vec<String> = chain[start..].iter().map(|n| n.to_string()).collect();
        cycle.push(number.to_string());
        return Err(HierarchyError::Cyclic {
            part: number.clone(),
            cycle: cycle.join(" -> "),
        });
    }

    chain.push(number.clone());
    let mut status = true;
    for parent in part.parents() {
        if !resolve(group, parent, chain, resolved)? {
            status = false;
            break;
        }
    }
    chain.pop();
    resolved.insert(number.clone(), status);

    Ok(status)
}

/// Errors raised while walking the usage hierarchy
#[derive(Debug, Error, Diagnostic)]
pub enum HierarchyError {
    #[error("cyclic usage hierarchy at {part}: {cycle}")]
    #[diagnostic(
        code(whereused::hierarchy::cyclic),
        help("a part cannot be used inside its own assemblies; check the reports for these parts")
    )]
    Cyclic { part: PartNumber, cycle: String },

    #[error("part {0} is referenced but not registered")]
    #[diagnostic(code(whereused::hierarchy::unknown_part))]
    UnknownPart(PartNumber),
}
