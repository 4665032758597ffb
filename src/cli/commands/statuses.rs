//! `whereused statuses` command - distinct release statuses across reports

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Project};
use crate::reports::collect_release_statuses;

#[derive(clap::Args, Debug)]
pub struct StatusesArgs {
    /// Directory of revision-history reports (default: the project's report directory)
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,
}

pub fn run(args: StatusesArgs, global: &GlobalOpts) -> Result<()> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => {
            let project = Project::open(global.project.as_deref())?;
            let config = Config::load(Some(&project));
            project.report_dir(&config)
        }
    };

    let statuses = collect_release_statuses(&dir)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&statuses).into_diagnostic()?);
        }
        OutputFormat::Csv | OutputFormat::Tsv => {
            let delimiter = if global.format == OutputFormat::Csv { b',' } else { b'\t' };
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(std::io::stdout());
            wtr.write_record(["Status", "P/N-Rev", "File"]).into_diagnostic()?;
            for s in &statuses {
                wtr.write_record([&s.status, &s.item, &s.file]).into_diagnostic()?;
            }
            wtr.flush().into_diagnostic()?;
        }
        OutputFormat::Id => {
            for s in &statuses {
                println!("{}", s.status);
            }
        }
        OutputFormat::Md | OutputFormat::Auto => {
            let mut builder = Builder::default();
            builder.push_record(["Status", "P/N-Rev", "File"]);
            for s in &statuses {
                builder.push_record([&s.status, &s.item, &s.file]);
            }
            let mut table = builder.build();
            if global.format == OutputFormat::Md {
                table.with(Style::markdown());
            } else {
                table.with(Style::rounded());
            }
            println!("{}", table);
        }
    }
    Ok(())
}
