//! Usage reports: single-level where-used, multi-level where-used and
//! multi-level BOM
//!
//! All three share one table layout (`Level`, `Part Number`, `Description`)
//! and differ only in which way the levels point:
//!
//! - single-level where-used: level 0 is the report part, every level-1 row
//!   is an assembly it is used in
//! - multi-level where-used: a row at level `n` is an assembly using the
//!   closest row above it at level `n-1`
//! - multi-level BOM: a row at level `n` is a component of the closest row
//!   above it at level `n-1`

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::registry::{PartGroup, UsageRow};
use crate::reports::{file_label, parse_level, ReportError, ReportName, Table};

pub const LEVEL_COLUMN: &str = "Level";
pub const PART_NUMBER_COLUMN: &str = "Part Number";
pub const DESCRIPTION_COLUMN: &str = "Description";

const REQUIRED_COLUMNS: [&str; 3] = [LEVEL_COLUMN, PART_NUMBER_COLUMN, DESCRIPTION_COLUMN];

/// Shape of a usage report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    SingleWhereUsed,
    MultiWhereUsed,
    MultiBom,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::SingleWhereUsed => write!(f, "single-level where-used"),
            ReportKind::MultiWhereUsed => write!(f, "multi-level where-used"),
            ReportKind::MultiBom => write!(f, "multi-level BOM"),
        }
    }
}

/// A row of a usage report
#[derive(Debug, Clone, PartialEq, Eq)]
struct LevelRow {
    line: usize,
    level: usize,
    part_number: String,
    description: String,
}

/// What one report contributed to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub file: String,
    pub subject: String,
    pub usages: usize,
    pub orphan: bool,
}

fn read_rows(table: &Table) -> Result<Vec<LevelRow>, ReportError> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.iter().any(|field| !field.is_empty()))
        .map(|(i, record)| {
            let raw_level = table.get(record, LEVEL_COLUMN);
            let level = parse_level(raw_level).ok_or_else(|| ReportError::InvalidLevel {
                file: table.file().to_string(),
                row: i + 2,
                value: raw_level.to_string(),
            })?;
            Ok(LevelRow {
                line: i + 2,
                level,
                part_number: table.get(record, PART_NUMBER_COLUMN).to_string(),
                description: table.get(record, DESCRIPTION_COLUMN).to_string(),
            })
        })
        .collect()
}

fn usage(child: &LevelRow, parent: &LevelRow) -> UsageRow {
    UsageRow {
        part_number: child.part_number.clone(),
        description: child.description.clone(),
        parent_part_number: parent.part_number.clone(),
        parent_description: parent.description.clone(),
    }
}

/// Turn level rows into usage facts according to the report shape
fn build_usages(file: &str, kind: ReportKind, rows: &[LevelRow]) -> Result<Vec<UsageRow>, ReportError> {
    let mut usages = Vec::new();
    // path[n] is the most recent row seen at level n
    let mut path: Vec<&LevelRow> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let line = row.line;
        if row.level == 0 {
            if i != 0 {
                return Err(ReportError::UnexpectedLevel {
                    file: file.to_string(),
                    row: line,
                    level: 0,
                    kind,
                });
            }
            path.push(row);
            continue;
        }

        if row.level > path.len() || (kind == ReportKind::SingleWhereUsed && row.level > 1) {
            return Err(ReportError::UnexpectedLevel {
                file: file.to_string(),
                row: line,
                level: row.level,
                kind,
            });
        }

        path.truncate(row.level);
        let above = path[row.level - 1];
        match kind {
            ReportKind::SingleWhereUsed | ReportKind::MultiWhereUsed => usages.push(usage(above, row)),
            ReportKind::MultiBom => usages.push(usage(row, above)),
        }
        path.push(row);
    }

    Ok(usages)
}

/// Ingest one report file into the registry
///
/// The file is validated completely (columns, levels, part numbers, report
/// ownership) before the registry is modified.
pub fn ingest_report(group: &mut PartGroup, path: &Path, kind: ReportKind) -> Result<ReportSummary, ReportError> {
    let table = Table::read(path, &REQUIRED_COLUMNS)?;
    let file = file_label(path);
    let rows = read_rows(&table)?;

    let subject = match rows.first() {
        Some(row) if row.level == 0 => row,
        _ => return Err(ReportError::MissingSubject { file }),
    };

    if let Some(name) = ReportName::parse(&file) {
        if !name.base_part_number().eq_ignore_ascii_case(subject.part_number.trim()) {
            return Err(ReportError::PartNumberMismatch {
                file,
                name_part: name.part_number.clone(),
                table_part: subject.part_number.clone(),
            });
        }
    }

    let usages = build_usages(&file, kind, &rows)?;

    let registry_err = |source| ReportError::Registry {
        file: file.clone(),
        source,
    };
    let subject_number = group.parse_number(&subject.part_number).map_err(|e| registry_err(e.into()))?;
    group.check_report_claim(&subject_number, &file).map_err(registry_err)?;
    for row in &rows {
        group.parse_number(&row.part_number).map_err(|e| registry_err(e.into()))?;
    }
    for usage in &usages {
        group.validate_usage(usage).map_err(registry_err)?;
    }

    // Everything checked; apply
    group
        .touch_from_report(&subject.part_number, &subject.description)
        .map_err(registry_err)?;
    for usage in &usages {
        group.add_usage(usage).map_err(registry_err)?;
    }
    group.claim_report(&subject_number, &file).map_err(registry_err)?;

    // An empty single-level where-used result is a confirmed orphan
    let orphan = kind == ReportKind::SingleWhereUsed
        && usages.is_empty()
        && group.part(&subject_number).is_some_and(|p| p.parents().is_empty() && !p.is_platform());
    if orphan {
        group.set_orphan(&subject_number).map_err(registry_err)?;
    }

    tracing::info!(file = %file, subject = %subject_number, usages = usages.len(), "ingested report");
    Ok(ReportSummary {
        file,
        subject: subject_number.to_string(),
        usages: usages.len(),
        orphan,
    })
}

/// Reads every report of one kind from a directory, remembering which files
/// it has already ingested so the directory can be rescanned after the
/// operator adds reports.
#[derive(Debug)]
pub struct ReportLoader {
    dir: PathBuf,
    kind: ReportKind,
    ingested: BTreeSet<PathBuf>,
}

impl ReportLoader {
    pub fn new(dir: impl Into<PathBuf>, kind: ReportKind) -> Self {
        Self {
            dir: dir.into(),
            kind,
            ingested: BTreeSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// CSV files in the report directory, sorted by path
    pub fn report_files(&self) -> Result<Vec<PathBuf>, ReportError> {
        if !self.dir.is_dir() {
            return Err(ReportError::Io {
                path: self.dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "report directory not found"),
            });
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.dir).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read directory entry");
                    continue;
                }
            };
            let is_csv = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if entry.file_type().is_file() && is_csv {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Ingest every report not yet seen
    pub fn load_new(&mut self, group: &mut PartGroup) -> Result<Vec<ReportSummary>, ReportError> {
        let mut summaries = Vec::new();
        for path in self.report_files()? {
            if self.ingested.contains(&path) {
                continue;
            }
            tracing::debug!(path = %path.display(), kind = %self.kind, "reading report");
            summaries.push(ingest_report(group, &path, self.kind)?);
            self.ingested.insert(path);
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_single_level_where_used() {
        let tmp = tempdir().unwrap();
        let path = write(
            tmp.path(),
            "2022-02-02_614575-A_where-used.csv",
            "Level,Part Number,Description\n0,614575,BRACKET\n1,637381,FRAME ASSY\n1,637382,OBS-OLD FRAME\n",
        );

        let mut group = PartGroup::default();
        let summary = ingest_report(&mut group, &path, ReportKind::SingleWhereUsed).unwrap();
        assert_eq!(summary.subject, "614575");
        assert_eq!(summary.usages, 2);
        assert!(!summary.orphan);

        let part = group.get_part("614575").unwrap();
        assert_eq!(part.parents().len(), 2);
        assert_eq!(part.source_report(), Some("2022-02-02_614575-A_where-used.csv"));
        assert!(group.get_part("637382").unwrap().obsolescence_disposition());
    }

    #[test]
    fn test_single_level_empty_marks_orphan() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "614575.csv", "Level,Part Number,Description\n0,614575,BRACKET\n");

        let mut group = PartGroup::default();
        let summary = ingest_report(&mut group, &path, ReportKind::SingleWhereUsed).unwrap();
        assert!(summary.orphan);
        assert!(group.get_part("614575").unwrap().is_orphan());
    }

    #[test]
    fn test_single_level_rejects_deeper_levels() {
        let tmp = tempdir().unwrap();
        let path = write(
            tmp.path(),
            "614575.csv",
            "Level,Part Number,Description\n0,614575,BRACKET\n1,637381,FRAME\n2,666111,PLATFORM\n",
        );
        let mut group = PartGroup::default();
        let err = ingest_report(&mut group, &path, ReportKind::SingleWhereUsed).unwrap_err();
        assert!(matches!(err, ReportError::UnexpectedLevel { level: 2, .. }));
        assert!(group.is_empty());
    }

    #[test]
    fn test_multi_level_where_used() {
        let tmp = tempdir().unwrap();
        let path = write(
            tmp.path(),
            "100001.csv",
            "Level,Part Number,Description\n0,100001,BOLT\n.1,200001,BRACKET ASSY\n..2,300001,FRAME ASSY\n.1,200002,MOUNT ASSY\n",
        );

        let mut group = PartGroup::default();
        ingest_report(&mut group, &path, ReportKind::MultiWhereUsed).unwrap();

        let bolt = group.get_part("100001").unwrap();
        let parents: Vec<String> = bolt.parents().iter().map(|p| p.to_string()).collect();
        assert_eq!(parents, vec!["200001", "200002"]);
        assert!(group.get_part("200001").unwrap().get_parent("300001").is_some());
        assert!(group.get_part("200002").unwrap().parents().is_empty());
    }

    #[test]
    fn test_multi_level_bom() {
        let tmp = tempdir().unwrap();
        let path = write(
            tmp.path(),
            "500001.csv",
            "Level,Part Number,Description\n0,500001,TOP ASSY\n1,400001,SUB ASSY\n2,100001,BOLT\n2,100002,NUT\n1,100003,WASHER\n",
        );

        let mut group = PartGroup::default();
        ingest_report(&mut group, &path, ReportKind::MultiBom).unwrap();

        assert!(group.get_part("400001").unwrap().get_parent("500001").is_some());
        assert!(group.get_part("100001").unwrap().get_parent("400001").is_some());
        assert!(group.get_part("100002").unwrap().get_parent("400001").is_some());
        assert!(group.get_part("100003").unwrap().get_parent("500001").is_some());
        assert_eq!(group.report_count(), 1);
    }

    #[test]
    fn test_level_jump_rejected() {
        let tmp = tempdir().unwrap();
        let path = write(
            tmp.path(),
            "500001.csv",
            "Level,Part Number,Description\n0,500001,TOP ASSY\n2,100001,BOLT\n",
        );
        let mut group = PartGroup::default();
        let err = ingest_report(&mut group, &path, ReportKind::MultiBom).unwrap_err();
        assert!(matches!(err, ReportError::UnexpectedLevel { row: 3, .. }));
    }

    #[test]
    fn test_missing_columns() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "x.csv", "Level,Number\n0,614575\n");
        let mut group = PartGroup::default();
        let err = ingest_report(&mut group, &path, ReportKind::MultiBom).unwrap_err();
        match err {
            ReportError::MissingColumns { missing, .. } => assert_eq!(missing, "Part Number, Description"),
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn test_file_name_mismatch() {
        let tmp = tempdir().unwrap();
        let path = write(
            tmp.path(),
            "2022-02-02_614575-A_where-used.csv",
            "Level,Part Number,Description\n0,614576,BRACKET\n",
        );
        let mut group = PartGroup::default();
        let err = ingest_report(&mut group, &path, ReportKind::SingleWhereUsed).unwrap_err();
        assert!(matches!(err, ReportError::PartNumberMismatch { .. }));
    }

    #[test]
    fn test_bad_part_number_leaves_registry_untouched() {
        let tmp = tempdir().unwrap();
        let path = write(
            tmp.path(),
            "614575.csv",
            "Level,Part Number,Description\n0,614575,BRACKET\n1,637381,FRAME\n1,ABC,BAD\n",
        );
        let mut group = PartGroup::default();
        let err = ingest_report(&mut group, &path, ReportKind::SingleWhereUsed).unwrap_err();
        assert!(matches!(err, ReportError::Registry { .. }));
        assert!(group.is_empty());
    }

    #[test]
    fn test_duplicate_report_rejected() {
        let tmp = tempdir().unwrap();
        write(tmp.path(), "a.csv", "Level,Part Number,Description\n0,614575,BRACKET\n1,637381,FRAME\n");
        write(tmp.path(), "b.csv", "Level,Part Number,Description\n0,614575,BRACKET\n1,637382,OTHER\n");

        let mut group = PartGroup::default();
        let mut loader = ReportLoader::new(tmp.path(), ReportKind::SingleWhereUsed);
        let err = loader.load_new(&mut group).unwrap_err();
        match err {
            ReportError::Registry { file, source } => {
                assert_eq!(file, "b.csv");
                assert!(matches!(source, crate::core::registry::RegistryError::DuplicateReport { .. }));
            }
            other => panic!("expected duplicate report, got {other:?}"),
        }
        assert!(!group.contains("637382"));
    }

    #[test]
    fn test_loader_skips_ingested_files() {
        let tmp = tempdir().unwrap();
        write(tmp.path(), "a.csv", "Level,Part Number,Description\n0,614575,BRACKET\n1,637381,FRAME\n");
        write(tmp.path(), "notes.txt", "not a report");

        let mut group = PartGroup::default();
        let mut loader = ReportLoader::new(tmp.path(), ReportKind::SingleWhereUsed);
        assert_eq!(loader.load_new(&mut group).unwrap().len(), 1);
        assert!(loader.load_new(&mut group).unwrap().is_empty());

        write(tmp.path(), "b.csv", "Level,Part Number,Description\n0,637381,FRAME\n");
        let summaries = loader.load_new(&mut group).unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].orphan);
    }
}
