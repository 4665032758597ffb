//! Revision-history audit
//!
//! A revision-history report lists every revision of every item using the
//! report part. The audit sorts it, works out each item's latest revision
//! and moves rows nobody needs to review (study files, GEOREPs, obsolete
//! rows, superseded revisions) to a trailing section with a comment saying
//! why.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use crate::core::revision::{is_experimental, is_production, latest_revision, parse_revision_list};
use crate::core::revision::{ReleaseStatus, RevisionScheme};
use crate::reports::{file_label, parse_level, ReportError, ReportName, Table};

const LEVEL: &str = "Level";
const CURRENT_ID: &str = "Current ID";
const CURRENT_REVISION: &str = "Current Revision";
const NAME: &str = "Name";
const RELEASE_STATUS: &str = "Release Status";
const REVISIONS: &str = "Revisions";
const DATE_MODIFIED: &str = "Date Modified";

const AUDIT_COLUMNS: [&str; 7] = [
    LEVEL,
    CURRENT_ID,
    CURRENT_REVISION,
    NAME,
    RELEASE_STATUS,
    REVISIONS,
    DATE_MODIFIED,
];

/// Blank rows written between the review section and the trailing section
const SECTION_GAP: usize = 4;

/// Date format used by the PLM export
const PLM_DATE_FORMAT: &str = "%d-%b-%Y %H:%M";

/// Why a row was moved out of the review section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditComment {
    Georep,
    LetterPartNumber,
    ChartDrawing,
    StudyFile,
    Obsolete,
    NewerRevExists,
    NewerStatusedRev,
    ProductionRevExists,
    NewerRevInReport,
}

impl AuditComment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditComment::Georep => "GEOREP",
            AuditComment::LetterPartNumber => "Part number starting with letters",
            AuditComment::ChartDrawing => "Chart drawing",
            AuditComment::StudyFile => "Study file",
            AuditComment::Obsolete => "Obsolete status",
            AuditComment::NewerRevExists => "Newer rev exists",
            AuditComment::NewerStatusedRev => "Newer statused rev in PLM",
            AuditComment::ProductionRevExists => "Production rev exists",
            AuditComment::NewerRevInReport => "Newer rev in report",
        }
    }
}

impl std::fmt::Display for AuditComment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processed row of a revision-history report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRow {
    pub part_number: String,
    pub revision: String,
    pub name: String,
    pub latest_revision: String,
    pub last_modified: String,
    pub comment: Option<AuditComment>,
    pub status: ReleaseStatus,
    pub revisions: Vec<String>,
}

/// A processed revision-history report
#[derive(Debug, Clone, Serialize)]
pub struct RevisionAudit {
    pub file: String,
    pub report_part: String,
    /// Rows worth reviewing
    pub core: Vec<AuditRow>,
    /// Rows moved out of review, each with a comment
    pub extra: Vec<AuditRow>,
}

fn convert_date(file: &str, row: usize, value: &str) -> Result<String, ReportError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    NaiveDateTime::parse_from_str(value, PLM_DATE_FORMAT)
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .map_err(|_| ReportError::InvalidDate {
            file: file.to_string(),
            row,
            value: value.to_string(),
        })
}

/// Comment for rows that never need review, independent of revisions
fn filter_comment(row: &AuditRow, raw_status: &str) -> Option<AuditComment> {
    let pn = row.part_number.to_uppercase();
    let name = row.name.to_uppercase();
    let letter_pn = !pn.chars().take(3).all(|c| c.is_ascii_digit());

    // Later checks win when several apply
    [
        (pn.contains("GEOREP"), AuditComment::Georep),
        (letter_pn, AuditComment::LetterPartNumber),
        (name.starts_with("CHART"), AuditComment::ChartDrawing),
        (name.contains("STUDY") || pn.contains("STUDY"), AuditComment::StudyFile),
        (raw_status.to_lowercase().contains("obsolete"), AuditComment::Obsolete),
    ]
    .into_iter()
    .filter_map(|(hit, comment)| hit.then_some(comment))
    .last()
}

impl RevisionAudit {
    /// Read and process a revision-history report
    pub fn from_path(path: &Path, scheme: &RevisionScheme) -> Result<Self, ReportError> {
        let table = Table::read(path, &AUDIT_COLUMNS)?;
        let file = file_label(path);

        let mut report_part = None;
        let mut rows: Vec<AuditRow> = Vec::new();
        let mut filtered: BTreeMap<usize, AuditComment> = BTreeMap::new();
        let mut raw_statuses: Vec<String> = Vec::new();

        for (i, record) in table.records.iter().enumerate() {
            let line = i + 2;
            let level = table.get(record, LEVEL);
            let part_number = table.get(record, CURRENT_ID).to_string();
            if parse_level(level) == Some(0) {
                report_part = Some(part_number);
                continue;
            }
            if part_number.is_empty() {
                continue;
            }

            let raw_status = table.get(record, RELEASE_STATUS);
            let status = ReleaseStatus::parse(raw_status).map_err(|source| ReportError::Revision {
                file: file.clone(),
                source,
            })?;
            let revisions = parse_revision_list(&part_number, table.get(record, REVISIONS));
            let latest = latest_revision(&revisions).unwrap_or_default().to_string();

            rows.push(AuditRow {
                revision: table.get(record, CURRENT_REVISION).to_string(),
                name: table.get(record, NAME).to_string(),
                latest_revision: latest,
                last_modified: convert_date(&file, line, table.get(record, DATE_MODIFIED))?,
                comment: None,
                status,
                revisions,
                part_number,
            });
            raw_statuses.push(raw_status.to_string());
        }

        let report_part = report_part.ok_or_else(|| ReportError::MissingSubject { file: file.clone() })?;
        if let Some(name) = ReportName::parse(&file) {
            if !name.part_number.eq_ignore_ascii_case(&report_part) {
                return Err(ReportError::PartNumberMismatch {
                    file,
                    name_part: name.part_number,
                    table_part: report_part,
                });
            }
        }

        let mut paired: Vec<(AuditRow, String)> = rows.into_iter().zip(raw_statuses).collect();
        paired.sort_by(|(a, _), (b, _)| {
            (a.part_number.as_str(), a.revision.as_str()).cmp(&(b.part_number.as_str(), b.revision.as_str()))
        });
        let mut rows: Vec<AuditRow> = Vec::with_capacity(paired.len());
        for (pos, (mut row, raw_status)) in paired.into_iter().enumerate() {
            if let Some(comment) = filter_comment(&row, &raw_status) {
                row.comment = Some(comment);
                filtered.insert(pos, comment);
            }
            rows.push(row);
        }

        let moved = mark_stale(&mut rows, &filtered, scheme);

        let mut core = Vec::new();
        let mut extra = Vec::new();
        for (pos, row) in rows.into_iter().enumerate() {
            if filtered.contains_key(&pos) || moved.contains(&pos) {
                extra.push(row);
            } else {
                core.push(row);
            }
        }

        tracing::info!(file = %file, core = core.len(), extra = extra.len(), "processed revision report");
        Ok(Self {
            file,
            report_part,
            core,
            extra,
        })
    }

    /// Default export file name: `<timestamp>_<part>_processed_report.csv`
    pub fn export_file_name(&self, timestamp: &str) -> String {
        format!("{}_{}_processed_report.csv", timestamp, self.report_part)
    }

    /// Write the review section, a gap, then the trailing section
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        let header = [
            "Part Number",
            "Revision",
            "Name",
            "Latest Rev",
            "Last Mod Date",
            "Comments",
            "Rev Status",
            "Rev List",
            "Report P/N",
        ];
        wtr.write_record(header)?;

        let write_row = |wtr: &mut csv::Writer<W>, row: &AuditRow| {
            wtr.write_record([
                row.part_number.as_str(),
                row.revision.as_str(),
                row.name.as_str(),
                row.latest_revision.as_str(),
                row.last_modified.as_str(),
                row.comment.map(|c| c.as_str()).unwrap_or_default(),
                row.status.as_str(),
                row.revisions.join(" ").as_str(),
                self.report_part.as_str(),
            ])
        };

        for row in &self.core {
            write_row(&mut wtr, row)?;
        }
        if !self.extra.is_empty() {
            let blank = vec![""; header.len()];
            for _ in 0..SECTION_GAP {
                wtr.write_record(&blank)?;
            }
            for row in &self.extra {
                write_row(&mut wtr, row)?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Comment superseded revisions and return the positions that leave review
fn mark_stale(
    rows: &mut [AuditRow],
    filtered: &BTreeMap<usize, AuditComment>,
    scheme: &RevisionScheme,
) -> BTreeSet<usize> {
    let mut by_part: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (pos, row) in rows.iter().enumerate() {
        if !filtered.contains_key(&pos) {
            by_part.entry(row.part_number.clone()).or_default().push(pos);
        }
    }

    let mut moved = BTreeSet::new();
    for positions in by_part.values() {
        let in_report: Vec<&str> = positions.iter().map(|&p| rows[p].revision.as_str()).collect();
        let latest_in_report = latest_revision(&in_report).unwrap_or_default().to_string();
        let latest = rows[positions[0]].latest_revision.clone();

        for &pos in positions {
            let row = &mut rows[pos];
            let newer_exists = row.revision != latest;
            let two_behind = match scheme.is_more_than_one_behind(&row.revision, &latest) {
                Ok(behind) => behind,
                Err(e) => {
                    tracing::warn!(part = %row.part_number, rev = %row.revision, error = %e, "cannot compare revisions");
                    false
                }
            };
            let production_exists = is_experimental(&row.revision) && is_production(&latest);
            let newer_in_report = row.revision != latest_in_report;

            // Later checks win when several apply
            let comment = [
                (newer_exists, AuditComment::NewerRevExists),
                (two_behind, AuditComment::NewerStatusedRev),
                (production_exists, AuditComment::ProductionRevExists),
                (newer_in_report, AuditComment::NewerRevInReport),
            ]
            .into_iter()
            .filter_map(|(hit, comment)| hit.then_some(comment))
            .last();
            if comment.is_some() {
                row.comment = comment;
            }
            if two_behind || production_exists || newer_in_report {
                moved.insert(pos);
            }
        }
    }
    moved
}

/// Where a release-status string was first seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSighting {
    pub status: String,
    /// `<part>-<rev>` of the first row carrying the status
    pub item: String,
    pub file: String,
}

/// Collect the distinct release-status strings across a directory of
/// dated revision-history reports
///
/// Reports that fail to read are skipped with a warning. Results are sorted
/// by status string.
pub fn collect_release_statuses(dir: &Path) -> Result<Vec<StatusSighting>, ReportError> {
    if !dir.is_dir() {
        return Err(ReportError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "report directory not found"),
        });
    }

    let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| ReportName::parse(&file_label(p)).is_some())
        .collect();
    paths.sort();

    let mut seen: BTreeMap<String, StatusSighting> = BTreeMap::new();
    for path in paths {
        let table = match Table::read(&path, &[CURRENT_ID, CURRENT_REVISION, RELEASE_STATUS]) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping report");
                continue;
            }
        };
        for record in &table.records {
            let status = table.get(record, RELEASE_STATUS);
            if status.is_empty() || seen.contains_key(status) {
                continue;
            }
            seen.insert(
                status.to_string(),
                StatusSighting {
                    status: status.to_string(),
                    item: format!(
                        "{}-{}",
                        table.get(record, CURRENT_ID),
                        table.get(record, CURRENT_REVISION)
                    ),
                    file: table.file().to_string(),
                },
            );
        }
    }
    Ok(seen.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "Level,Current ID,Current Revision,Name,Release Status,Revisions,Date Modified\n";

    fn audit(contents: &str) -> RevisionAudit {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("2022-02-02_614575-A_revs.csv");
        fs::write(&path, format!("{HEADER}{contents}")).unwrap();
        RevisionAudit::from_path(&path, &RevisionScheme::default()).unwrap()
    }

    fn find<'a>(rows: &'a [AuditRow], pn: &str, rev: &str) -> &'a AuditRow {
        rows.iter()
            .find(|r| r.part_number == pn && r.revision == rev)
            .unwrap_or_else(|| panic!("{pn}-{rev} not found"))
    }

    #[test]
    fn test_latest_revision_stays_in_review() {
        let audit = audit(
            "0,614575,A,BRACKET,Released,614575-A-BRACKET,01-Feb-2022 10:00\n\
             1,637381,B,FRAME ASSY,Released,\"637381-A-FRAME ASSY, 637381-B-FRAME ASSY\",10-Mar-2022 14:05\n",
        );
        assert_eq!(audit.report_part, "614575");
        assert_eq!(audit.core.len(), 1);
        let row = &audit.core[0];
        assert_eq!(row.latest_revision, "B");
        assert_eq!(row.last_modified, "2022-03-10");
        assert_eq!(row.status, ReleaseStatus::CheckeredFlag);
        assert_eq!(row.comment, None);
        assert!(audit.extra.is_empty());
    }

    #[test]
    fn test_older_revision_in_report_moves() {
        let audit = audit(
            "0,614575,A,BRACKET,,,\n\
             1,637381,A,FRAME ASSY,Superseded,\"637381-A-FRAME ASSY, 637381-B-FRAME ASSY\",\n\
             1,637381,B,FRAME ASSY,Released,\"637381-A-FRAME ASSY, 637381-B-FRAME ASSY\",\n",
        );
        assert_eq!(audit.core.len(), 1);
        assert_eq!(audit.core[0].revision, "B");
        let old = find(&audit.extra, "637381", "A");
        assert_eq!(old.comment, Some(AuditComment::NewerRevInReport));
    }

    #[test]
    fn test_one_behind_stays_with_comment() {
        let audit = audit(
            "0,614575,A,BRACKET,,,\n\
             1,637381,A,FRAME ASSY,Released,\"637381-A-FRAME ASSY, 637381-B-FRAME ASSY\",\n",
        );
        let row = find(&audit.core, "637381", "A");
        assert_eq!(row.comment, Some(AuditComment::NewerRevExists));
    }

    #[test]
    fn test_two_behind_moves() {
        let audit = audit(
            "0,614575,A,BRACKET,,,\n\
             1,637381,A,FRAME ASSY,Released,\"637381-A-X, 637381-B-X, 637381-C-X\",\n",
        );
        assert!(audit.core.is_empty());
        assert_eq!(
            find(&audit.extra, "637381", "A").comment,
            Some(AuditComment::NewerStatusedRev)
        );
    }

    #[test]
    fn test_experimental_superseded_by_production() {
        let audit = audit(
            "0,614575,A,BRACKET,,,\n\
             1,637381,01,FRAME ASSY,Beta,\"637381-01-X, 637381-A-X\",\n",
        );
        assert_eq!(
            find(&audit.extra, "637381", "01").comment,
            Some(AuditComment::ProductionRevExists)
        );
    }

    #[test]
    fn test_filtered_rows() {
        let audit = audit(
            "0,614575,A,BRACKET,,,\n\
             1,637381-GEOREP1,A,FRAME,,637381-GEOREP1-A-FRAME,\n\
             1,ABC123,A,FIXTURE,,ABC123-A-FIXTURE,\n\
             1,700001,A,CHART - BOLTS,,700001-A-CHART - BOLTS,\n\
             1,700002,A,Packaging study,,700002-A-Packaging study,\n\
             1,700003,A,OLD FRAME,Obsolete,700003-A-OLD FRAME,\n",
        );
        assert!(audit.core.is_empty());
        let comments: Vec<_> = audit.extra.iter().map(|r| r.comment).collect();
        assert_eq!(
            comments,
            vec![
                Some(AuditComment::Georep),
                Some(AuditComment::ChartDrawing),
                Some(AuditComment::StudyFile),
                Some(AuditComment::Obsolete),
                Some(AuditComment::LetterPartNumber),
            ]
        );
    }

    #[test]
    fn test_unknown_status_fails() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("revs.csv");
        fs::write(&path, format!("{HEADER}0,614575,A,BRACKET,,,\n1,637381,A,FRAME,Pending Review,,\n")).unwrap();
        let err = RevisionAudit::from_path(&path, &RevisionScheme::default()).unwrap_err();
        assert!(matches!(err, ReportError::Revision { .. }));
    }

    #[test]
    fn test_write_csv_sections() {
        let audit = audit(
            "0,614575,A,BRACKET,,,\n\
             1,637381,B,FRAME,Released,\"637381-A-FRAME, 637381-B-FRAME\",\n\
             1,700003,A,OLD,Obsolete,700003-A-OLD,\n",
        );
        let mut out = Vec::new();
        audit.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Part Number,Revision"));
        assert!(lines[1].starts_with("637381,B,FRAME,B"));
        assert_eq!(lines.len(), 1 + 1 + SECTION_GAP + 1);
        assert!(lines[6].starts_with("700003,A,OLD"));
        assert!(lines[6].contains("Obsolete status"));
    }

    #[test]
    fn test_collect_release_statuses() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("2022-02-02_614575-A_revs.csv"),
            format!("{HEADER}0,614575,A,BRACKET,Released,,\n1,637381,B,FRAME,Beta,,\n1,637382,A,FRAME,Released,,\n"),
        )
        .unwrap();
        fs::write(
            tmp.path().join("2022-02-03_637381-B_revs.csv"),
            "Level,Name\n0,broken\n",
        )
        .unwrap();
        fs::write(tmp.path().join("notes.csv"), format!("{HEADER}0,1,A,X,Obsolete,,\n")).unwrap();

        let statuses = collect_release_statuses(tmp.path()).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].status, "Beta");
        assert_eq!(statuses[0].item, "637381-B");
        assert_eq!(statuses[1].status, "Released");
        assert_eq!(statuses[1].item, "614575-A");
        assert_eq!(statuses[1].file, "2022-02-02_614575-A_revs.csv");
    }
}
