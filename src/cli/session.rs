//! Shared command setup: project, configuration and a seeded part registry

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::{GlobalOpts, TargetArgs};
use crate::core::{Config, PartGroup, Project};
use crate::reports::{ReportKind, ReportLoader};

/// Everything a where-used or BOM command starts from
pub struct Session {
    pub project: Project,
    pub config: Config,
    pub group: PartGroup,
}

impl Session {
    /// Open the project and seed the registry with platforms and targets
    ///
    /// `--target-part` values replace the target file for this run only.
    pub fn open(global: &GlobalOpts, targets: &TargetArgs) -> Result<Self> {
        let project = Project::open(global.project.as_deref())?;
        let config = Config::load(Some(&project));
        let mut group = PartGroup::new(config.min_part_digits());

        let platforms = project.load_platform_table()?;
        let count = group.import_platforms(&platforms)?;
        tracing::debug!(count, "platforms loaded");

        let specs = if targets.target_parts.is_empty() {
            project.load_target_specs()?
        } else {
            targets.target_parts.clone()
        };
        group.register_target_parts(&specs)?;

        Ok(Self {
            project,
            config,
            group,
        })
    }

    pub fn report_dir(&self) -> PathBuf {
        self.project.report_dir(&self.config)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.project.export_dir(&self.config)
    }

    /// Ingest every report of `kind` in the report directory
    pub fn load_reports(&mut self, kind: ReportKind, global: &GlobalOpts) -> Result<ReportLoader> {
        let mut loader = ReportLoader::new(self.report_dir(), kind);
        let summaries = loader.load_new(&mut self.group)?;
        if !global.quiet {
            eprintln!(
                "{} Read {} {} report(s) from {}",
                style("→").blue(),
                summaries.len(),
                kind,
                style(loader.dir().display()).cyan()
            );
        }
        Ok(loader)
    }

    /// Fail early when a command needs target parts and none were given
    pub fn require_targets(&self) -> Result<()> {
        if self.group.target_numbers().is_empty() {
            return Err(miette::miette!(
                help = "list parts in target_parts.txt or pass --target-part",
                "no target parts"
            ));
        }
        Ok(())
    }
}

/// Write `contents` to `path`, or stdout when the path is `-`
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if path.as_os_str() == "-" {
        print!("{}", contents);
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    std::fs::write(path, contents).into_diagnostic()?;
    eprintln!("{} Wrote {}", style("✓").green(), style(path.display()).cyan());
    Ok(())
}

/// Timestamp used in export file names
pub fn export_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H%M%S").to_string()
}
