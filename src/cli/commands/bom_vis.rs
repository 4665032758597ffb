//! `whereused bom-vis` command - DOT graph of every ingested multi-level BOM
//!
//! Every BOM in the report directory ends up on the graph.

use miette::Result;
use std::path::PathBuf;

use crate::cli::graph::{render_dot, GraphOptions, GraphScope};
use crate::cli::session::{write_output, Session};
use crate::cli::{GlobalOpts, TargetArgs};
use crate::reports::ReportKind;

#[derive(clap::Args, Debug)]
pub struct BomVisArgs {
    /// Output file (default: stdout)
    #[arg(long, short = 'o', default_value = "-")]
    pub output: PathBuf,

    /// Omit part descriptions from graph nodes
    #[arg(long)]
    pub compact: bool,

    /// Sparse colouring suitable for printing
    #[arg(long)]
    pub printout: bool,
}

pub fn run(args: BomVisArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global, &TargetArgs::default())?;
    session.load_reports(ReportKind::MultiBom, global)?;

    let options = GraphOptions {
        compact: args.compact,
        printout: args.printout,
        exclude_obs: false,
    };
    let dot = render_dot(&session.group, GraphScope::All, &options)?;
    write_output(&args.output, &dot)
}
