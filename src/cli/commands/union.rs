//! `whereused union` command - union BOM of the target parts
//!
//! Reads multi-level BOMs and lists the targets plus every part used anywhere
//! beneath them. Targets that no BOM mentions cannot be expanded; they are
//! reported and the operator decides whether to continue.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::cli::output::{build_listing, render_listing, to_delimited, ListingColumns};
use crate::cli::session::{export_timestamp, write_output, Session};
use crate::cli::{GlobalOpts, TargetArgs};
use crate::core::union_bom::UnionBom;
use crate::reports::ReportKind;

#[derive(clap::Args, Debug)]
pub struct UnionArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Also list the platforms each part is used on
    #[arg(long)]
    pub platforms: bool,

    /// Continue without prompting when targets are missing from every BOM
    #[arg(long)]
    pub allow_missing: bool,

    /// Prompt repeatedly for a single part and show its union BOM
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Also write the listing as CSV to this file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write the listing as CSV into the export directory
    #[arg(long)]
    pub export: bool,
}

pub fn run(args: UnionArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global, &args.targets)?;
    session.load_reports(ReportKind::MultiBom, global)?;

    let columns = ListingColumns {
        status: false,
        platforms: args.platforms,
    };

    if args.interactive {
        return run_loop(&session, columns, global);
    }

    session.require_targets()?;
    let union = session.group.union_bom_for_targets()?;
    check_missing(&union, args.allow_missing)?;
    let csv = print_union(&session, &union, columns, global)?;

    let output = match (&args.output, args.export) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(session.export_dir().join(format!("{}_union_bom.csv", export_timestamp()))),
        (None, false) => None,
    };
    if let Some(path) = output {
        write_output(&path, &csv)?;
    }
    Ok(())
}

/// Print the union listing; returns it rendered as CSV for export
fn print_union(session: &Session, union: &UnionBom, columns: ListingColumns, global: &GlobalOpts) -> Result<String> {
    let group = &session.group;
    let parts = union
        .parts
        .iter()
        .filter_map(|n| group.part(n))
        .filter(|p| !p.is_platform());
    let rows = build_listing(group, parts, columns)?;
    print!("{}", render_listing(&rows, columns, global.format)?);
    if !global.quiet {
        eprintln!("{} {} part(s) in union BOM", style("✓").green(), rows.len());
    }
    to_delimited(&rows, columns, b',')
}

fn check_missing(union: &UnionBom, allow_missing: bool) -> Result<()> {
    if union.is_complete() {
        return Ok(());
    }

    let missing: Vec<String> = union.missing_targets.iter().map(|n| n.to_string()).collect();
    eprintln!(
        "{} {} target part(s) not found in any BOM, so not expanded:",
        style("!").yellow(),
        missing.len()
    );
    for number in &missing {
        eprintln!("  {}", number);
    }

    if allow_missing {
        return Ok(());
    }
    if console::user_attended() {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Continue without expanding them?")
            .default(true)
            .interact()
            .into_diagnostic()?;
        if proceed {
            return Ok(());
        }
    }
    Err(miette::miette!(
        help = "export multi-level BOMs for these parts, or pass --allow-missing",
        "target parts missing from every BOM: {}",
        missing.join(", ")
    ))
}

fn run_loop(session: &Session, columns: ListingColumns, global: &GlobalOpts) -> Result<()> {
    let theme = ColorfulTheme::default();
    loop {
        let input: String = Input::with_theme(&theme)
            .with_prompt("Part number (blank to quit)")
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let Some(part) = session.group.get_part(input) else {
            println!("{} {} not found in any BOM", style("!").yellow(), input);
            continue;
        };
        let targets: BTreeSet<_> = [part.number().clone()].into_iter().collect();
        let union = session.group.union_bom(&targets)?;
        print_union(session, &union, columns, global)?;
    }
}
