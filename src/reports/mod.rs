//! Report ingestion
//!
//! Reports are CSV exports from the PLM/ERP system. Each adapter checks the
//! columns it needs up front and fails the whole file on the first problem;
//! nothing from a failing file reaches the registry.

pub mod audit;
pub mod usage;

use chrono::NaiveDate;
use miette::Diagnostic;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::registry::RegistryError;
use crate::core::revision::RevisionError;

pub use audit::{collect_release_statuses, AuditComment, AuditRow, RevisionAudit, StatusSighting};
pub use usage::{ingest_report, ReportKind, ReportLoader, ReportSummary};

/// Name of a dated report file, e.g. `2022-02-02_614575-A_where-used.csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportName {
    pub date: NaiveDate,
    pub part_number: String,
    pub revision: String,
}

impl ReportName {
    /// Parse a report file name; `None` if it does not follow the dated pattern
    pub fn parse(file_name: &str) -> Option<Self> {
        let mut fields = file_name.split('_');
        let date = NaiveDate::parse_from_str(fields.next()?, "%Y-%m-%d").ok()?;
        let item = fields.next()?;

        let (part_number, revision) = match item.strip_suffix("--") {
            Some(part_number) => (part_number, "-"),
            None => item.rsplit_once('-')?,
        };
        if part_number.is_empty() || revision.is_empty() {
            return None;
        }

        Some(Self {
            date,
            part_number: part_number.to_uppercase(),
            revision: revision.to_string(),
        })
    }

    /// Part number with any `-GEOREP…` suffix removed
    pub fn base_part_number(&self) -> &str {
        match self.part_number.find("-GEOREP") {
            Some(idx) => &self.part_number[..idx],
            None => &self.part_number,
        }
    }
}

/// Display name used to identify a report in messages and ownership records
pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// A CSV table with named columns
pub(crate) struct Table {
    file: String,
    columns: HashMap<String, usize>,
    pub(crate) records: Vec<csv::StringRecord>,
}

impl Table {
    pub(crate) fn read(path: &Path, required: &[&str]) -> Result<Self, ReportError> {
        let file = file_label(path);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| ReportError::Csv {
                file: file.clone(),
                source,
            })?;

        let headers = reader.headers().map_err(|source| ReportError::Csv {
            file: file.clone(),
            source,
        })?;
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), i))
            .collect();

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|col| !columns.contains_key(*col))
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::MissingColumns {
                file,
                missing: missing.join(", "),
                expected: format!("expected columns: {}", required.join(", ")),
            });
        }

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ReportError::Csv {
                file: file.clone(),
                source,
            })?;

        Ok(Self {
            file,
            columns,
            records,
        })
    }

    pub(crate) fn file(&self) -> &str {
        &self.file
    }

    /// Value of `column` in `record`; empty when the row is short
    pub(crate) fn get<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.columns
            .get(column)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }
}

/// Parse a BOM level such as `0`, `1` or SAP-style `..2`
pub(crate) fn parse_level(value: &str) -> Option<usize> {
    value.trim().trim_start_matches('.').parse().ok()
}

/// Errors raised while reading reports
#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    #[error("failed to read {}: {source}", path.display())]
    #[diagnostic(code(whereused::report::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: malformed CSV: {source}")]
    #[diagnostic(code(whereused::report::csv))]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{file}: missing column(s) {missing}")]
    #[diagnostic(code(whereused::report::columns))]
    MissingColumns {
        file: String,
        missing: String,
        #[help]
        expected: String,
    },

    #[error("{file}: first row must be the level-0 report part")]
    #[diagnostic(code(whereused::report::subject))]
    MissingSubject { file: String },

    #[error("{file}: file name says {name_part} but the level-0 row is {table_part}")]
    #[diagnostic(
        code(whereused::report::mismatch),
        help("rename the file or re-export the report for the right part")
    )]
    PartNumberMismatch {
        file: String,
        name_part: String,
        table_part: String,
    },

    #[error("{file}: row {row}: invalid level '{value}'")]
    #[diagnostic(code(whereused::report::level))]
    InvalidLevel { file: String, row: usize, value: String },

    #[error("{file}: row {row}: level {level} is not allowed in a {kind} report")]
    #[diagnostic(code(whereused::report::unexpected_level))]
    UnexpectedLevel {
        file: String,
        row: usize,
        level: usize,
        kind: ReportKind,
    },

    #[error("{file}: {source}")]
    #[diagnostic(code(whereused::report::registry))]
    Registry {
        file: String,
        #[source]
        #[diagnostic_source]
        source: RegistryError,
    },

    #[error("{file}: {source}")]
    #[diagnostic(code(whereused::report::revision))]
    Revision {
        file: String,
        #[source]
        #[diagnostic_source]
        source: RevisionError,
    },

    #[error("{file}: row {row}: invalid date '{value}'")]
    #[diagnostic(
        code(whereused::report::date),
        help("dates are expected like 10-Mar-2022 14:05")
    )]
    InvalidDate { file: String, row: usize, value: String },
}
