//! `whereused init` command - Initialize a new project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Fill in missing files even if .whereused/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized whereused project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} List the parts to analyse in target_parts.txt",
                style("1.").yellow()
            );
            println!(
                "  {} Export where-used or BOM reports as CSV into reports/",
                style("2.").yellow()
            );
            println!(
                "  {} Run {} or {}",
                style("3.").yellow(),
                style("whereused single").yellow(),
                style("whereused union").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} whereused project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to restore missing files",
                style("whereused init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        ".whereused/",
        ".whereused/config.yaml",
        ".whereused/platforms.yaml",
        "target_parts.txt",
        "reports/",
        "exports/",
    ];

    for entry in entries {
        if root.join(entry).exists() {
            let prefix = if entry.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(entry).dim());
        }
    }
}
