//! whereused: BOM where-used analysis
//!
//! Rebuilds a part-usage hierarchy from where-used and BOM reports exported
//! from a PLM/ERP system, decides which parts can be obsoleted, and computes
//! union BOMs and revision audits.

pub mod cli;
pub mod core;
pub mod entities;
pub mod reports;
