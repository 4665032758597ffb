//! Part entity type - parts, assemblies, mods and platforms

use std::collections::BTreeSet;

use crate::core::identity::PartNumber;

/// What kind of node a part is in the usage hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Ordinary part, assembly or mod. Obsolescence follows from its parents
    /// unless the name already marks it obsolete.
    Standard { obsolescence_disposition: bool },

    /// Root of the hierarchy with an externally supplied status
    Platform { can_obsolete: bool },
}

impl std::fmt::Display for PartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartKind::Standard { .. } => write!(f, "part"),
            PartKind::Platform { .. } => write!(f, "platform"),
        }
    }
}

/// A single part known to a [`PartGroup`](crate::core::registry::PartGroup)
///
/// Parents are stored as part-number handles into the owning registry, so
/// there is exactly one `Part` per number and everyone holding a handle sees
/// later updates (name backfill, new parents).
#[derive(Debug, Clone)]
pub struct Part {
    number: PartNumber,
    name: String,
    kind: PartKind,
    parents: BTreeSet<PartNumber>,
    orphan: bool,
    source_report: Option<String>,
}

impl Part {
    /// Create a standard part, deriving its disposition from `name` once
    pub fn standard(number: PartNumber, name: impl Into<String>) -> Self {
        let name = name.into();
        let obsolescence_disposition = has_obs_marker(&name);
        Self {
            number,
            name,
            kind: PartKind::Standard {
                obsolescence_disposition,
            },
            parents: BTreeSet::new(),
            orphan: false,
            source_report: None,
        }
    }

    /// Create a platform with an authoritative status
    pub fn platform(number: PartNumber, name: impl Into<String>, can_obsolete: bool) -> Self {
        Self {
            number,
            name: name.into(),
            kind: PartKind::Platform { can_obsolete },
            parents: BTreeSet::new(),
            orphan: false,
            source_report: None,
        }
    }

    pub fn number(&self) -> &PartNumber {
        &self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    pub fn is_platform(&self) -> bool {
        matches!(self.kind, PartKind::Platform { .. })
    }

    /// Terminal nodes end the upward walk through the hierarchy
    pub fn is_terminal(&self) -> bool {
        self.is_platform()
    }

    /// True when the name carries an OBS marker (always false for platforms)
    pub fn obsolescence_disposition(&self) -> bool {
        match self.kind {
            PartKind::Standard {
                obsolescence_disposition,
            } => obsolescence_disposition,
            PartKind::Platform { .. } => false,
        }
    }

    /// Assemblies this part is used in
    pub fn parents(&self) -> &BTreeSet<PartNumber> {
        &self.parents
    }

    /// Look up a direct parent by number
    pub fn get_parent(&self, number: &str) -> Option<&PartNumber> {
        self.parents.get(number.trim().to_uppercase().as_str())
    }

    /// Record a parent assembly. Returns `false` if it was already known.
    ///
    /// A part with a parent is no longer an orphan, so the flag is cleared.
    /// Callers must not pass parents to platforms; the registry enforces it.
    pub(crate) fn add_parent(&mut self, parent: PartNumber) -> bool {
        debug_assert!(!self.is_platform());
        let inserted = self.parents.insert(parent);
        if !self.parents.is_empty() {
            self.orphan = false;
        }
        inserted
    }

    pub fn is_orphan(&self) -> bool {
        self.orphan
    }

    pub(crate) fn set_orphan(&mut self) {
        self.orphan = true;
    }

    /// Fill in the name if none is known yet. The disposition is not recomputed.
    pub(crate) fn set_name_if_empty(&mut self, name: &str) -> bool {
        let name = name.trim();
        if self.name.is_empty() && !name.is_empty() {
            self.name = name.to_string();
            true
        } else {
            false
        }
    }

    pub fn source_report(&self) -> Option<&str> {
        self.source_report.as_deref()
    }

    pub(crate) fn set_source_report(&mut self, report: impl Into<String>) {
        self.source_report = Some(report.into());
    }

    /// Turn a standard part into a platform, keeping its name
    pub(crate) fn promote_to_platform(&mut self, can_obsolete: bool) {
        self.kind = PartKind::Platform { can_obsolete };
        self.orphan = false;
    }
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number)
    }
}

/// Names like `OBS-WIDGET` or `obs - widget` mark a part as already obsolete
pub fn has_obs_marker(name: &str) -> bool {
    let upper = name.trim_start().to_uppercase();
    match upper.strip_prefix("OBS") {
        Some(rest) => rest.trim_start().starts_with('-'),
        None => false,
    }
}
