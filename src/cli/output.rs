//! Part listings in the supported output formats

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_flag, truncate_str};
use crate::cli::OutputFormat;
use crate::core::registry::{PartGroup, RegistryError};
use crate::entities::part::Part;

/// Which optional columns a listing carries
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingColumns {
    /// Obsolescence status and orphan flag
    pub status: bool,
    /// Platforms each part is used on
    pub platforms: bool,
}

/// One row of a part listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    pub part_number: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_obsolete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
}

impl ListingRow {
    pub fn build(group: &PartGroup, part: &Part, columns: ListingColumns) -> Result<Self, RegistryError> {
        let can_obsolete = if columns.status {
            Some(group.obsolescence_status(part.number())?)
        } else {
            None
        };
        let platforms = columns.platforms.then(|| {
            group
                .platform_applications(part.number())
                .iter()
                .map(|p| p.number().to_string())
                .collect()
        });

        Ok(Self {
            part_number: part.number().to_string(),
            name: part.name().to_string(),
            can_obsolete,
            orphan: columns.status.then(|| part.is_orphan()),
            platforms,
        })
    }
}

/// Build listing rows for `parts`, in the order given
pub fn build_listing<'a>(
    group: &PartGroup,
    parts: impl IntoIterator<Item = &'a Part>,
    columns: ListingColumns,
) -> Result<Vec<ListingRow>, RegistryError> {
    parts
        .into_iter()
        .map(|part| ListingRow::build(group, part, columns))
        .collect()
}

fn headers(columns: ListingColumns) -> Vec<&'static str> {
    let mut headers = vec!["Part Number", "Name"];
    if columns.status {
        headers.extend(["Can Obsolete", "Orphan"]);
    }
    if columns.platforms {
        headers.push("Platforms");
    }
    headers
}

fn fields(row: &ListingRow, columns: ListingColumns, max_name: Option<usize>) -> Vec<String> {
    let name = match max_name {
        Some(max) => truncate_str(&row.name, max),
        None => row.name.clone(),
    };
    let mut fields = vec![row.part_number.clone(), name];
    if columns.status {
        fields.push(format_flag(row.can_obsolete.unwrap_or_default()));
        fields.push(format_flag(row.orphan.unwrap_or_default()));
    }
    if columns.platforms {
        fields.push(row.platforms.as_deref().unwrap_or_default().join(" "));
    }
    fields
}

/// Serialize rows as delimited text with a header line
pub fn to_delimited(rows: &[ListingRow], columns: ListingColumns, delimiter: u8) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_writer(Vec::new());
    wtr.write_record(headers(columns)).into_diagnostic()?;
    for row in rows {
        wtr.write_record(fields(row, columns, None)).into_diagnostic()?;
    }
    let bytes = wtr.into_inner().into_diagnostic()?;
    String::from_utf8(bytes).into_diagnostic()
}

/// Render rows in the requested format
pub fn render_listing(rows: &[ListingRow], columns: ListingColumns, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Csv => to_delimited(rows, columns, b','),
        OutputFormat::Tsv => to_delimited(rows, columns, b'\t'),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(rows).into_diagnostic()?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Id => Ok(rows.iter().map(|r| format!("{}\n", r.part_number)).collect()),
        OutputFormat::Md | OutputFormat::Auto => {
            let mut builder = Builder::default();
            builder.push_record(headers(columns));
            for row in rows {
                builder.push_record(fields(row, columns, Some(50)));
            }
            let mut table = builder.build();
            if format == OutputFormat::Md {
                table.with(Style::markdown());
            } else {
                table.with(Style::rounded());
            }
            Ok(format!("{}\n", table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::UsageRow;
    use std::collections::BTreeMap;

    fn group() -> PartGroup {
        let mut group = PartGroup::default();
        let platforms: BTreeMap<String, bool> = [("666111-LWB".to_string(), false)].into_iter().collect();
        group.import_platforms(&platforms).unwrap();
        group
            .add_usage(&UsageRow {
                part_number: "614575".to_string(),
                description: "BRACKET, STEEL".to_string(),
                parent_part_number: "666111".to_string(),
                parent_description: String::new(),
            })
            .unwrap();
        group
    }

    fn rows(group: &PartGroup, columns: ListingColumns) -> Vec<ListingRow> {
        build_listing(group, group.parts(true), columns).unwrap()
    }

    #[test]
    fn test_listing_row_columns() {
        let group = group();
        let columns = ListingColumns {
            status: true,
            platforms: true,
        };
        let rows = rows(&group, columns);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].can_obsolete, Some(false));
        assert_eq!(rows[0].orphan, Some(false));
        assert_eq!(rows[0].platforms.as_deref(), Some(&["666111".to_string()][..]));
    }

    #[test]
    fn test_csv_quotes_commas() {
        let group = group();
        let columns = ListingColumns::default();
        let csv = render_listing(&rows(&group, columns), columns, OutputFormat::Csv).unwrap();
        assert_eq!(csv, "Part Number,Name\n614575,\"BRACKET, STEEL\"\n");
    }

    #[test]
    fn test_json_skips_unrequested_columns() {
        let group = group();
        let columns = ListingColumns::default();
        let json = render_listing(&rows(&group, columns), columns, OutputFormat::Json).unwrap();
        assert!(json.contains("\"part_number\": \"614575\""));
        assert!(!json.contains("can_obsolete"));
    }

    #[test]
    fn test_id_format() {
        let group = group();
        let columns = ListingColumns::default();
        let ids = render_listing(&rows(&group, columns), columns, OutputFormat::Id).unwrap();
        assert_eq!(ids, "614575\n");
    }
}
