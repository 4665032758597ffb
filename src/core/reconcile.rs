//! Missing-report reconciliation
//!
//! After ingesting single-level where-used reports, some parts may still have
//! no report, no orphan determination, no OBS disposition and no platform
//! status, so their obsolescence cannot be trusted. This module finds them and
//! applies operator decisions. Prompting and re-reading the report directory
//! are left to the caller, which loops until [`ReconcileStep::Pending`] stops
//! coming back.

use crate::core::identity::PartNumber;
use crate::core::registry::{PartGroup, RegistryError};
use crate::entities::part::Part;

/// Operator decision for an incomplete part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Confirmed: the part is not used anywhere
    MarkOrphan(PartNumber),

    /// New reports were ingested; just re-check
    ReportsAdded,

    /// Proceed with the parts that are still incomplete
    AcceptPartial,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStep {
    /// Every part is accounted for
    Complete,

    /// Parts that still need a report or an orphan determination
    Pending { incomplete: Vec<PartNumber> },

    /// The operator accepted a partial result with these parts unresolved
    Partial { accepted: Vec<PartNumber> },
}

/// Whether a part still needs a report or an orphan determination
pub fn is_incomplete(group: &PartGroup, part: &Part) -> bool {
    !part.is_platform()
        && !part.is_orphan()
        && !part.obsolescence_disposition()
        && !group.has_report(part.number())
}

/// Parts whose status cannot yet be determined, in part-number order
pub fn find_incomplete(group: &PartGroup) -> Vec<PartNumber> {
    group
        .parts(true)
        .into_iter()
        .filter(|part| is_incomplete(group, part))
        .map(|part| part.number().clone())
        .collect()
}

/// Apply `resolutions` and report what is left
pub fn reconcile_step(
    group: &mut PartGroup,
    resolutions: &[Resolution],
) -> Result<ReconcileStep, RegistryError> {
    // All orphan marks must be valid before any is applied
    for resolution in resolutions {
        if let Resolution::MarkOrphan(number) = resolution {
            group.check_orphan(number)?;
        }
    }

    let mut accept_partial = false;
    for resolution in resolutions {
        match resolution {
            Resolution::MarkOrphan(number) => {
                group.set_orphan(number)?;
                tracing::info!(part = %number, "marked as orphan");
            }
            Resolution::ReportsAdded => {}
            Resolution::AcceptPartial => accept_partial = true,
        }
    }

    let incomplete = find_incomplete(group);
    Ok(if incomplete.is_empty() {
        ReconcileStep::Complete
    } else if accept_partial {
        tracing::warn!(count = incomplete.len(), "accepted partial result");
        ReconcileStep::Partial {
            accepted: incomplete,
        }
    } else {
        ReconcileStep::Pending { incomplete }
    })
}
