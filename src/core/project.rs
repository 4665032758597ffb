//! Project discovery and structure
//!
//! A project is any directory containing `.whereused/`. It holds the platform
//! table, the target part list, the report directory and the export
//! directory.

use miette::Diagnostic;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::Config;
use crate::core::registry::parse_target_list;

/// Represents a whereused project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .whereused/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Use an explicit root if given, otherwise discover from the current directory
    pub fn open(root: Option<&Path>) -> Result<Self, ProjectError> {
        match root {
            Some(root) => {
                let root = root
                    .canonicalize()
                    .map_err(|e| ProjectError::IoError(e.to_string()))?;
                if root.join(".whereused").is_dir() {
                    Ok(Self { root })
                } else {
                    Err(ProjectError::NotFound { searched_from: root })
                }
            }
            None => Self::discover(),
        }
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(".whereused").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(".whereused").exists() {
            return Err(ProjectError::AlreadyExists(root.clone()));
        }

        Self::init_force(&root)
    }

    /// Initialize even if .whereused/ exists; existing files are kept
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let project = Self { root };

        for dir in [project.meta_dir(), project.root.join("reports"), project.root.join("exports")] {
            std::fs::create_dir_all(&dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        let files = [
            (project.config_path(), Self::default_config()),
            (project.platforms_path(), Self::default_platforms()),
            (project.targets_path(), Self::default_targets()),
        ];
        for (path, contents) in files {
            if !path.exists() {
                std::fs::write(&path, contents).map_err(|e| ProjectError::IoError(e.to_string()))?;
            }
        }

        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# whereused project configuration

# Minimum leading digits of a valid part number (5 for legacy sources)
# min_part_digits: 6

# Where exported reports are read from
# report_dir: reports

# Where CSV and graph exports are written
# export_dir: exports

# Letters allowed in production revisions, in order
# revision_letters: ABCDEFGHJKLMNPRTUVWY
"#
    }

    fn default_platforms() -> &'static str {
        r#"# Platforms and whether each may be obsoleted
# "<number>-<description>": true | false
{}
"#
    }

    fn default_targets() -> &'static str {
        "# Target parts, one per line: <number> or <number>-<description>\n"
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .whereused configuration directory
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(".whereused")
    }

    pub fn config_path(&self) -> PathBuf {
        self.meta_dir().join("config.yaml")
    }

    pub fn platforms_path(&self) -> PathBuf {
        self.meta_dir().join("platforms.yaml")
    }

    pub fn targets_path(&self) -> PathBuf {
        self.root.join("target_parts.txt")
    }

    pub fn report_dir(&self, config: &Config) -> PathBuf {
        self.root.join(config.report_dir())
    }

    pub fn export_dir(&self, config: &Config) -> PathBuf {
        self.root.join(config.export_dir())
    }

    /// Read the platform table; a missing file is an empty table
    pub fn load_platform_table(&self) -> Result<BTreeMap<String, bool>, ProjectError> {
        let path = self.platforms_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ProjectError::IoError(e.to_string()))?;
        let table: Option<BTreeMap<String, bool>> =
            serde_yml::from_str(&contents).map_err(|e| ProjectError::InvalidPlatformTable {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(table.unwrap_or_default())
    }

    /// Read the target part list; a missing file is an empty list
    pub fn load_target_specs(&self) -> Result<Vec<String>, ProjectError> {
        let path = self.targets_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ProjectError::IoError(e.to_string()))?;
        Ok(parse_target_list(&contents))
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("not a whereused project (searched from {searched_from:?})")]
    #[diagnostic(
        code(whereused::project::not_found),
        help("run 'whereused init' to create one")
    )]
    NotFound { searched_from: PathBuf },

    #[error("whereused project already exists at {0:?}")]
    #[diagnostic(code(whereused::project::exists))]
    AlreadyExists(PathBuf),

    #[error("invalid platform table {path:?}: {message}")]
    #[diagnostic(
        code(whereused::project::platforms),
        help("entries look like \"666111-PLATFORM NAME\": true")
    )]
    InvalidPlatformTable { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(whereused::project::io))]
    IoError(String),
}
