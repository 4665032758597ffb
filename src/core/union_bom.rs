//! Union BOM - every part used anywhere beneath a set of target parts

use std::collections::BTreeSet;

use crate::core::identity::PartNumber;
use crate::core::registry::{PartGroup, RegistryError};

/// Result of a union BOM computation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionBom {
    /// Targets plus every part whose ancestors include a target
    pub parts: BTreeSet<PartNumber>,

    /// Targets that no ingested report mentions, so nothing below them is
    /// known. They are still members of `parts`.
    pub missing_targets: Vec<PartNumber>,
}

impl UnionBom {
    pub fn is_complete(&self) -> bool {
        self.missing_targets.is_empty()
    }
}

impl PartGroup {
    /// Compute the union BOM of `targets`
    ///
    /// Recomputed on every call from the current graph.
    pub fn union_bom(&self, targets: &BTreeSet<PartNumber>) -> Result<UnionBom, RegistryError> {
        if self.report_count() == 0 {
            return Err(RegistryError::NoReportsIngested);
        }

        if let Some(unknown) = targets.iter().find(|t| self.part(t).is_none()) {
            return Err(RegistryError::UnknownPart(unknown.clone()));
        }

        let missing_targets: Vec<PartNumber> = targets
            .iter()
            .filter(|t| !self.in_report_universe(t))
            .cloned()
            .collect();
        if !missing_targets.is_empty() {
            tracing::warn!(count = missing_targets.len(), "target parts not found in any report");
        }

        let mut parts = targets.clone();
        for part in self.parts(false) {
            if parts.contains(part.number()) {
                continue;
            }
            let ancestors = self.ancestors(part.number());
            if !ancestors.is_disjoint(targets) {
                parts.insert(part.number().clone());
            }
        }

        tracing::debug!(targets = targets.len(), parts = parts.len(), "computed union BOM");
        Ok(UnionBom {
            parts,
            missing_targets,
        })
    }

    /// Union BOM of the registry's own target set
    pub fn union_bom_for_targets(&self) -> Result<UnionBom, RegistryError> {
        self.union_bom(self.target_numbers())
    }
}
