//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    assy_list::AssyListArgs, bom_vis::BomVisArgs, completions::CompletionsArgs, config::ConfigCommands,
    init::InitArgs, multi::MultiArgs, platform::PlatformArgs, revs::RevsArgs, single::SingleArgs,
    statuses::StatusesArgs, union::UnionArgs,
};

#[derive(Parser)]
#[command(name = "whereused")]
#[command(author, version, about = "Where-used and obsolescence analysis for BOM reports")]
#[command(
    long_about = "Rebuilds part usage hierarchies from where-used and BOM reports exported from a PLM/ERP system, \
                  decides which parts can be obsoleted, and builds union BOMs and revision audits."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .whereused/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new whereused project
    Init(InitArgs),

    /// Single-level where-used reports: walk up from the target parts,
    /// asking for missing reports, and decide which targets can be obsoleted
    Single(SingleArgs),

    /// Multi-level where-used reports: decide which targets can be obsoleted
    Multi(MultiArgs),

    /// Multi-level BOMs: every part used anywhere beneath the target parts
    Union(UnionArgs),

    /// Multi-level BOMs: platforms each target part is used on
    Platform(PlatformArgs),

    /// Multi-level where-used reports: assemblies above each target part
    AssyList(AssyListArgs),

    /// Multi-level BOMs: graph of the whole BOM hierarchy
    BomVis(BomVisArgs),

    /// Audit a revision-history report
    Revs(RevsArgs),

    /// List the distinct release statuses found in revision-history reports
    Statuses(StatusesArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table on a terminal
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just part numbers, one per line
    Id,
}

/// Target part selection shared by the where-used and BOM commands
#[derive(clap::Args, Clone, Debug, Default)]
pub struct TargetArgs {
    /// Target part to use instead of target_parts.txt (repeatable)
    #[arg(long = "target-part", short = 't', value_name = "PART")]
    pub target_parts: Vec<String>,
}

/// Graph rendering options
#[derive(clap::Args, Clone, Debug, Default)]
pub struct GraphArgs {
    /// Write a DOT graph of the hierarchy to this file ('-' for stdout)
    #[arg(long, value_name = "PATH")]
    pub dot: Option<PathBuf>,

    /// Omit part descriptions from graph nodes
    #[arg(long)]
    pub compact: bool,

    /// Sparse colouring suitable for printing
    #[arg(long)]
    pub printout: bool,
}
