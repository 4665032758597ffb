//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::identity::DEFAULT_MIN_DIGITS;
use crate::core::project::Project;
use crate::core::revision::{RevisionError, RevisionScheme};

/// whereused configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Minimum leading digits of a valid part number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_part_digits: Option<usize>,

    /// Directory holding exported reports (relative to the project root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,

    /// Directory exports are written to (relative to the project root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// Ordered letters allowed in production revisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_letters: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/whereused/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.whereused/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(digits) = std::env::var("WHEREUSED_MIN_DIGITS") {
            match digits.parse() {
                Ok(digits) => config.min_part_digits = Some(digits),
                Err(_) => tracing::warn!(value = %digits, "ignoring invalid WHEREUSED_MIN_DIGITS"),
            }
        }
        if let Ok(dir) = std::env::var("WHEREUSED_REPORT_DIR") {
            config.report_dir = Some(PathBuf::from(dir));
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config");
                return None;
            }
        };
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "whereused")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.min_part_digits.is_some() {
            self.min_part_digits = other.min_part_digits;
        }
        if other.report_dir.is_some() {
            self.report_dir = other.report_dir;
        }
        if other.export_dir.is_some() {
            self.export_dir = other.export_dir;
        }
        if other.revision_letters.is_some() {
            self.revision_letters = other.revision_letters;
        }
    }

    pub fn min_part_digits(&self) -> usize {
        self.min_part_digits.unwrap_or(DEFAULT_MIN_DIGITS)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(|| PathBuf::from("reports"))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("exports"))
    }

    /// Revision scheme built from `revision_letters`, or the default alphabet
    pub fn revision_scheme(&self) -> Result<RevisionScheme, RevisionError> {
        match &self.revision_letters {
            Some(letters) => RevisionScheme::new(letters),
            None => Ok(RevisionScheme::default()),
        }
    }

    /// Look up a value by key for `config show`
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "min_part_digits" => Some(self.min_part_digits().to_string()),
            "report_dir" => Some(self.report_dir().display().to_string()),
            "export_dir" => Some(self.export_dir().display().to_string()),
            "revision_letters" => Some(
                self.revision_letters
                    .clone()
                    .unwrap_or_else(|| crate::core::revision::DEFAULT_REVISION_LETTERS.to_string()),
            ),
            _ => None,
        }
    }

    /// All known configuration keys
    pub fn keys() -> &'static [&'static str] {
        &["min_part_digits", "report_dir", "export_dir", "revision_letters"]
    }
}
