//! Snapshot export of a finished coordination run.
//!
//! Two sinks are supported:
//!
//! - **JSON**: one document with `merged_results`, `statistics` and
//!   `execution_log`.
//! - **CSV**: one row per merged record. Set-valued columns are
//!   comma-joined in sorted order (and quoted by the writer).
//!
//! Exporting reads the result; it never modifies it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CoordError, Result};
use crate::orchestrator::stats::Statistics;
use crate::types::{CoordinationResult, PatentRecord};

/// CSV column order.
pub const CSV_HEADER: [&str; 11] = [
    "patent_number",
    "title",
    "abstract",
    "claims",
    "description",
    "inventors",
    "applicants",
    "ipc_classes",
    "images",
    "source_databases",
    "source_url",
];

const LIST_SEPARATOR: &str = ",";

/// Output format for [`export`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(CoordError::Export(format!("unknown export format: {other}"))),
        }
    }
}

/// The JSON export document. Borrowed from the result being exported.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub merged_results: &'a [PatentRecord],
    pub statistics: &'a Statistics,
    pub execution_log: &'a [String],
}

impl<'a> From<&'a CoordinationResult> for ExportDocument<'a> {
    fn from(result: &'a CoordinationResult) -> Self {
        Self {
            merged_results: &result.merged_records,
            statistics: &result.statistics,
            execution_log: &result.execution_log,
        }
    }
}

/// Render `result` as a pretty-printed JSON document.
///
/// # Errors
///
/// Returns [`CoordError::Export`] if serialization fails.
pub fn to_json(result: &CoordinationResult) -> Result<String> {
    serde_json::to_string_pretty(&ExportDocument::from(result))
        .map_err(|e| CoordError::Export(format!("failed to serialize JSON: {e}")))
}

/// Write the merged records of `result` as CSV to `writer`.
///
/// # Errors
///
/// Returns [`CoordError::Export`] on any write failure.
pub fn write_csv<W: Write>(result: &CoordinationResult, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_HEADER).map_err(csv_error)?;
    for record in &result.merged_records {
        out.write_record(csv_row(record)).map_err(csv_error)?;
    }
    out.flush()
        .map_err(|e| CoordError::Export(format!("failed to flush CSV: {e}")))
}

/// Write `result` to `path` in `format`, creating parent directories.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns [`CoordError::Io`] if the file or its directory cannot be created,
/// and [`CoordError::Export`] if encoding fails.
pub fn export(result: &CoordinationResult, path: &Path, format: ExportFormat) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match format {
        ExportFormat::Json => fs::write(path, to_json(result)?)?,
        ExportFormat::Csv => write_csv(result, fs::File::create(path)?)?,
    }

    tracing::info!(path = %path.display(), %format, records = result.merged_records.len(), "exported results");
    Ok(path.to_path_buf())
}

fn csv_row(record: &PatentRecord) -> Vec<String> {
    vec![
        record.patent_number.clone(),
        record.title.clone(),
        record.abstract_text.clone().unwrap_or_default(),
        record.claims.clone().unwrap_or_default(),
        record.description.clone().unwrap_or_default(),
        join(record.inventors.iter().map(String::as_str)),
        join(record.applicants.iter().map(String::as_str)),
        join(record.ipc_classes.iter().map(String::as_str)),
        join(record.images.iter().map(String::as_str)),
        join(record.source_databases.iter().map(|id| id.as_str())),
        record.source_url.clone().unwrap_or_default(),
    ]
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(LIST_SEPARATOR)
}

fn csv_error(e: csv::Error) -> CoordError {
    CoordError::Export(format!("failed to write CSV: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoordinationStatus, DatabaseId};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn sample() -> CoordinationResult {
        let mut record = PatentRecord::new("US1234567", "Widget");
        record.abstract_text = Some("A widget, with commas".into());
        record.inventors = ["Lin".to_owned(), "Chen".to_owned()].into();
        record.source_databases = [DatabaseId::new("uspto"), DatabaseId::new("twpat")].into();

        CoordinationResult {
            status: CoordinationStatus::Completed,
            error: None,
            databases_searched: vec![DatabaseId::new("uspto"), DatabaseId::new("twpat")],
            statistics: Statistics {
                total_databases_searched: 2,
                total_found: 2,
                merged_count: 1,
                dedup_ratio: 0.5,
                ..Default::default()
            },
            merged_records: vec![record],
            per_database_results: BTreeMap::new(),
            downloaded_artifacts: Vec::new(),
            elapsed: Duration::from_millis(10),
            execution_log: vec!["starting multi-database search: uspto, twpat".into()],
        }
    }

    #[test]
    fn format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().expect("json"), ExportFormat::Json);
        assert_eq!(" CSV ".parse::<ExportFormat>().expect("csv"), ExportFormat::Csv);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn json_document_shape() {
        let json = to_json(&sample()).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["merged_results"][0]["patent_number"], "US1234567");
        assert_eq!(value["merged_results"][0]["abstract"], "A widget, with commas");
        assert_eq!(value["statistics"]["merged_count"], 1);
        assert_eq!(value["execution_log"].as_array().map(Vec::len), Some(1));
        assert!(value.get("per_database_results").is_none());
    }

    #[test]
    fn csv_header_and_row() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf).expect("csv");
        let text = String::from_utf8(buf).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));
        let row = lines.next().expect("row");
        assert!(row.starts_with("US1234567,Widget,\"A widget, with commas\""));
        assert!(row.contains("\"Chen,Lin\""));
        assert!(row.contains("\"twpat,uspto\""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn export_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("run.csv");
        let result = sample();
        let written = export(&result, &path, ExportFormat::Csv).expect("export");
        assert_eq!(written, path);
        assert!(path.exists());
        assert_eq!(result.merged_records.len(), 1);
    }

    #[test]
    fn export_json_round_trips_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        export(&sample(), &path, ExportFormat::Json).expect("export");
        let text = fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(value["statistics"]["total_found"], 2);
    }
}
