//! `whereused assy-list` command - assemblies above each target part

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::session::Session;
use crate::cli::{GlobalOpts, OutputFormat, TargetArgs};
use crate::reports::ReportKind;

#[derive(clap::Args, Debug)]
pub struct AssyListArgs {
    #[command(flatten)]
    pub targets: TargetArgs,
}

#[derive(Debug, Serialize)]
struct AssemblyEntry {
    part_number: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct TargetAssemblies {
    part_number: String,
    name: String,
    assemblies: Vec<AssemblyEntry>,
}

pub fn run(args: AssyListArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global, &args.targets)?;
    session.require_targets()?;
    session.load_reports(ReportKind::MultiWhereUsed, global)?;

    let group = &session.group;
    let lists: Vec<TargetAssemblies> = group
        .target_parts()
        .into_iter()
        .map(|target| TargetAssemblies {
            part_number: target.number().to_string(),
            name: target.name().to_string(),
            assemblies: group
                .assemblies_above(target.number())
                .into_iter()
                .map(|p| AssemblyEntry {
                    part_number: p.number().to_string(),
                    name: p.name().to_string(),
                })
                .collect(),
        })
        .collect();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&lists).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for list in &lists {
                for assy in &list.assemblies {
                    println!("{}", assy.part_number);
                }
            }
        }
        _ => {
            for list in &lists {
                println!("{}:", style(&list.part_number).bold());
                if list.assemblies.is_empty() {
                    println!("\t{}", style("(no assemblies)").dim());
                }
                for assy in &list.assemblies {
                    println!("\t{} - {}", assy.part_number, assy.name);
                }
            }
        }
    }
    Ok(())
}
