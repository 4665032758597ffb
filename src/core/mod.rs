//! Core module - part identity, the part registry and the algorithms over it

pub mod config;
pub mod identity;
pub mod obsolescence;
pub mod project;
pub mod reconcile;
pub mod registry;
pub mod revision;
pub mod union_bom;

pub use config::Config;
pub use identity::{PartNumber, PartNumberError, PartSpec};
pub use obsolescence::{obsolescence_status, HierarchyError};
pub use project::{Project, ProjectError};
pub use reconcile::{find_incomplete, reconcile_step, ReconcileStep, Resolution};
pub use registry::{PartGroup, RegistryError, UsageRow};
pub use revision::{ReleaseStatus, RevisionDistance, RevisionError, RevisionScheme};
pub use union_bom::UnionBom;
