//! Entity type definitions
//!
//! - [`Part`] - a part number with its name, parents and orphan flag
//! - [`PartKind`] - standard part or platform (a root of the hierarchy)

pub mod part;

pub use part::{Part, PartKind};
