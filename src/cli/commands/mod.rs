//! CLI command implementations

pub mod assy_list;
pub mod bom_vis;
pub mod completions;
pub mod config;
pub mod init;
pub mod multi;
pub mod platform;
pub mod revs;
pub mod single;
pub mod statuses;
pub mod union;
