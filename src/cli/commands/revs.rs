//! `whereused revs` command - audit a revision-history report
//!
//! Writes a CSV with the rows worth reviewing first, then a gap, then the
//! rows moved out of review with the reason in the comments column.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::session::export_timestamp;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Project};
use crate::reports::RevisionAudit;

#[derive(clap::Args, Debug)]
pub struct RevsArgs {
    /// Revision-history report (CSV)
    pub report: PathBuf,

    /// Output file (default: <timestamp>_<part>_processed_report.csv next to the report)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: RevsArgs, global: &GlobalOpts) -> Result<()> {
    // Outside a project the defaults and global config still apply
    let project = Project::open(global.project.as_deref()).ok();
    let config = Config::load(project.as_ref());
    let scheme = config.revision_scheme()?;

    let audit = RevisionAudit::from_path(&args.report, &scheme)?;

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&audit).into_diagnostic()?);
        return Ok(());
    }

    let path = args.output.unwrap_or_else(|| {
        let dir = args
            .report
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        dir.join(audit.export_file_name(&export_timestamp()))
    });
    let file = std::fs::File::create(&path).into_diagnostic()?;
    audit.write_csv(file).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} {} row(s) to review, {} moved aside",
            style("✓").green(),
            audit.core.len(),
            audit.extra.len()
        );
        println!("{} Wrote {}", style("✓").green(), style(path.display()).cyan());
    }
    Ok(())
}
