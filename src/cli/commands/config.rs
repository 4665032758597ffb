//! `whereused config` command - Configuration inspection

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::project::Project;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values
    Show(ShowArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

const KEY_DESCRIPTIONS: &[(&str, &str)] = &[
    ("min_part_digits", "Minimum leading digits of a valid part number"),
    ("report_dir", "Directory reports are read from"),
    ("export_dir", "Directory exports are written to"),
    ("revision_letters", "Ordered letters allowed in production revisions"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    let project = Project::open(global.project.as_deref()).ok();
    match cmd {
        ConfigCommands::Show(args) => run_show(args, project.as_ref()),
        ConfigCommands::Path => run_path(project.as_ref()),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, project: Option<&Project>) -> Result<()> {
    let config = Config::load(project);

    if let Some(key) = &args.key {
        let value = config.get(key).ok_or_else(|| {
            miette::miette!(
                help = format!("known keys: {}", Config::keys().join(", ")),
                "unknown configuration key '{}'",
                key
            )
        })?;
        println!("{}", value);
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for key in Config::keys() {
        let value = config.get(key).unwrap_or_default();
        println!("  {}: {}", style(key).cyan(), style(value).yellow());
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (WHEREUSED_MIN_DIGITS, WHEREUSED_REPORT_DIR)");
    println!("  2. Project config (.whereused/config.yaml)");
    println!("  3. Global config (~/.config/whereused/config.yaml)");
    Ok(())
}

fn run_path(project: Option<&Project>) -> Result<()> {
    let global_path: Option<PathBuf> = Config::global_config_path();

    println!("{}", style("Configuration file paths:").bold());
    println!();
    match global_path {
        Some(path) => print_path("Global:", &path),
        None => println!("  {} {}", style("Global:").cyan(), style("(unavailable)").dim()),
    }

    println!();
    match project {
        Some(project) => print_path("Project:", &project.config_path()),
        None => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in a whereused project)").dim()
        ),
    }
    Ok(())
}

fn print_path(label: &str, path: &std::path::Path) {
    println!("  {} {}", style(label).cyan(), path.display());
    let state = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {:width$} {}", "", state, width = label.len());
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in KEY_DESCRIPTIONS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }
    Ok(())
}
