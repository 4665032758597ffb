//! `whereused multi` command - multi-level where-used analysis

use miette::Result;

use crate::cli::graph::{render_dot, GraphOptions, GraphScope};
use crate::cli::output::{build_listing, render_listing, ListingColumns};
use crate::cli::session::{write_output, Session};
use crate::cli::{GlobalOpts, GraphArgs, TargetArgs};
use crate::reports::ReportKind;

#[derive(clap::Args, Debug)]
pub struct MultiArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    #[command(flatten)]
    pub graph: GraphArgs,

    /// Leave already-obsolete and orphaned parts out of the graph
    #[arg(long, short = 'e')]
    pub exclude_obs: bool,

    /// Also list the platforms each target is used on
    #[arg(long)]
    pub platforms: bool,
}

pub fn run(args: MultiArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global, &args.targets)?;
    session.require_targets()?;
    session.load_reports(ReportKind::MultiWhereUsed, global)?;

    let group = &session.group;
    let columns = ListingColumns {
        status: true,
        platforms: args.platforms,
    };
    let rows = build_listing(group, group.target_parts(), columns)?;
    print!("{}", render_listing(&rows, columns, global.format)?);

    if let Some(path) = &args.graph.dot {
        let options = GraphOptions {
            compact: args.graph.compact,
            printout: args.graph.printout,
            exclude_obs: args.exclude_obs,
        };
        write_output(path, &render_dot(group, GraphScope::Targets, &options)?)?;
    }
    Ok(())
}
