//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod graph;
pub mod helpers;
pub mod output;
pub mod session;

pub use args::{Cli, Commands, GlobalOpts, GraphArgs, OutputFormat, TargetArgs};
