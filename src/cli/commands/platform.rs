//! `whereused platform` command - platform applications of the target parts
//!
//! Only platforms whose multi-level BOM is in the report directory can show
//! up next to the parts they use.

use miette::Result;

use crate::cli::output::{build_listing, render_listing, ListingColumns};
use crate::cli::session::Session;
use crate::cli::{GlobalOpts, TargetArgs};
use crate::reports::ReportKind;

#[derive(clap::Args, Debug)]
pub struct PlatformArgs {
    #[command(flatten)]
    pub targets: TargetArgs,
}

pub fn run(args: PlatformArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global, &args.targets)?;
    session.require_targets()?;
    session.load_reports(ReportKind::MultiBom, global)?;

    let group = &session.group;
    let columns = ListingColumns {
        status: false,
        platforms: true,
    };
    let targets = group.target_parts().into_iter().filter(|p| !p.is_platform());
    let rows = build_listing(group, targets, columns)?;
    print!("{}", render_listing(&rows, columns, global.format)?);
    Ok(())
}
