//! `whereused single` command - single-level where-used analysis
//!
//! Each single-level report only names the assemblies one level up, so the
//! hierarchy above a target is usually incomplete after the first pass. The
//! command lists the parts still missing a report and lets the operator add
//! reports and rescan, mark parts as orphans, or accept a partial result.

use console::style;
use dialoguer::{theme::ColorfulTheme, MultiSelect, Select};
use miette::{IntoDiagnostic, Result};

use crate::cli::graph::{render_dot, GraphOptions, GraphScope};
use crate::cli::output::{build_listing, render_listing, ListingColumns};
use crate::cli::session::{write_output, Session};
use crate::cli::{GlobalOpts, GraphArgs, TargetArgs};
use crate::core::identity::PartNumber;
use crate::core::reconcile::{reconcile_step, ReconcileStep, Resolution};
use crate::reports::{ReportKind, ReportLoader};

#[derive(clap::Args, Debug)]
pub struct SingleArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    #[command(flatten)]
    pub graph: GraphArgs,

    /// Proceed with parts still missing reports instead of prompting
    #[arg(long)]
    pub accept_partial: bool,
}

pub fn run(args: SingleArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global, &args.targets)?;
    session.require_targets()?;
    let mut loader = session.load_reports(ReportKind::SingleWhereUsed, global)?;

    let unresolved = reconcile(&mut session, &mut loader, args.accept_partial, global)?;
    if !unresolved.is_empty() && !global.quiet {
        eprintln!(
            "{} Status of parts above {} unreported part(s) is a best guess",
            style("!").yellow(),
            unresolved.len()
        );
    }

    let group = &session.group;
    let columns = ListingColumns {
        status: true,
        platforms: false,
    };
    let rows = build_listing(group, group.target_parts(), columns)?;
    print!("{}", render_listing(&rows, columns, global.format)?);

    if let Some(path) = &args.graph.dot {
        let options = GraphOptions {
            compact: args.graph.compact,
            printout: args.graph.printout,
            exclude_obs: false,
        };
        let dot = render_dot(group, GraphScope::Targets, &options)?;
        write_output(path, &dot)?;
    }
    Ok(())
}

/// Drive reconciliation until complete or accepted as partial
///
/// Returns the parts left unresolved.
fn reconcile(
    session: &mut Session,
    loader: &mut ReportLoader,
    accept_partial: bool,
    global: &GlobalOpts,
) -> Result<Vec<PartNumber>> {
    let mut resolutions = Vec::new();
    loop {
        match reconcile_step(&mut session.group, &resolutions)? {
            ReconcileStep::Complete => return Ok(Vec::new()),
            ReconcileStep::Partial { accepted } => return Ok(accepted),
            ReconcileStep::Pending { incomplete } => {
                if accept_partial {
                    resolutions = vec![Resolution::AcceptPartial];
                    continue;
                }
                if !console::user_attended() {
                    let list: Vec<String> = incomplete.iter().map(|n| n.to_string()).collect();
                    return Err(miette::miette!(
                        help = "add the missing reports, or pass --accept-partial",
                        "{} part(s) have no where-used report: {}",
                        incomplete.len(),
                        list.join(", ")
                    ));
                }
                resolutions = prompt(session, loader, &incomplete, global)?;
            }
        }
    }
}

fn prompt(
    session: &mut Session,
    loader: &mut ReportLoader,
    incomplete: &[PartNumber],
    global: &GlobalOpts,
) -> Result<Vec<Resolution>> {
    println!();
    println!(
        "{} {} part(s) need a single-level where-used report:",
        style("?").cyan(),
        incomplete.len()
    );
    let labels: Vec<String> = incomplete
        .iter()
        .map(|number| match session.group.part(number) {
            Some(part) if !part.name().is_empty() => format!("{} - {}", number, part.name()),
            _ => number.to_string(),
        })
        .collect();
    for label in &labels {
        println!("  {}", label);
    }
    println!();

    let theme = ColorfulTheme::default();
    let choices = [
        "Rescan the report directory (after exporting more reports)",
        "Mark parts as orphans (not used anywhere)",
        "Accept the partial result",
    ];
    let choice = Select::with_theme(&theme)
        .with_prompt("How do you want to continue?")
        .items(&choices)
        .default(0)
        .interact()
        .into_diagnostic()?;

    match choice {
        0 => {
            let summaries = loader.load_new(&mut session.group)?;
            if !global.quiet {
                println!(
                    "{} Read {} new report(s)",
                    style("→").blue(),
                    summaries.len()
                );
            }
            Ok(vec![Resolution::ReportsAdded])
        }
        1 => {
            let picked = MultiSelect::with_theme(&theme)
                .with_prompt("Select orphans (space to toggle, enter to confirm)")
                .items(&labels)
                .interact()
                .into_diagnostic()?;
            Ok(picked
                .into_iter()
                .map(|i| Resolution::MarkOrphan(incomplete[i].clone()))
                .collect())
        }
        _ => Ok(vec![Resolution::AcceptPartial]),
    }
}
