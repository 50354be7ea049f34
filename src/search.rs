//! Turning command-line input into a query, and a finished run into output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use patent_coord::{
    BackendStatus, CoordinationResult, DatabaseId, ExecutionMode, ExportFormat, SearchQuery,
};

use crate::config::{ExportConfig, HubConfig};
use crate::error::{HubError, Result};

/// Records listed in the summary before truncating.
pub const SUMMARY_RECORD_LIMIT: usize = 20;

/// Search input as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
    pub databases: Vec<String>,
    pub keywords: Vec<String>,
    pub patent_number: Option<String>,
    pub sequential: bool,
    pub max_results: Option<usize>,
}

/// Build and validate a query from `input`, starting from the configured
/// search defaults.
///
/// # Errors
///
/// Returns an error if neither keywords nor a patent number were given, or
/// the resulting options are invalid.
pub fn build_query(config: &HubConfig, input: SearchInput) -> Result<SearchQuery> {
    let mut options = config.search.clone();
    if let Some(max) = input.max_results {
        options.max_results_per_db = max;
    }

    let query = SearchQuery {
        keywords: (!input.keywords.is_empty()).then_some(input.keywords),
        patent_number: input.patent_number,
        target_databases: input.databases.iter().map(DatabaseId::new).collect(),
        options,
        mode: if input.sequential {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel
        },
    };
    query.validate()?;
    Ok(query)
}

/// Decide where (and whether) to export a run.
///
/// An explicit `output` path always exports; its format comes from `format`,
/// then the file extension, then `[export] format`. Without `output`, a
/// timestamped file is written under the export directory only when
/// `[export] enabled` is set.
///
/// # Errors
///
/// Returns an error if `format` names an unknown format.
pub fn export_destination(
    export: &ExportConfig,
    default_dir: &Path,
    output: Option<&Path>,
    format: Option<&str>,
    now: DateTime<Local>,
) -> Result<Option<(PathBuf, ExportFormat)>> {
    let explicit = format.map(str::parse::<ExportFormat>).transpose()?;

    if let Some(path) = output {
        let inferred = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse::<ExportFormat>().ok());
        let format = explicit.or(inferred).unwrap_or(export.format);
        return Ok(Some((path.to_path_buf(), format)));
    }

    if !export.enabled {
        return Ok(None);
    }
    let format = explicit.unwrap_or(export.format);
    let dir = export.dir.clone().unwrap_or_else(|| default_dir.to_path_buf());
    let file = format!("search-{}.{}", now.format("%Y%m%d-%H%M%S"), format.extension());
    Ok(Some((dir.join(file), format)))
}

/// Human-readable summary of a run.
pub fn summarize(result: &CoordinationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Searched {} database(s) in {:.2}s",
        result.databases_searched.len(),
        result.elapsed.as_secs_f64()
    );

    for id in &result.databases_searched {
        let Some(backend) = result.per_database_results.get(id) else {
            let _ = writeln!(out, "  {:<8} not run", id.as_str());
            continue;
        };
        match backend.status {
            BackendStatus::Completed => {
                let _ = writeln!(out, "  {:<8} completed  {} results", id.as_str(), backend.records.len());
            }
            BackendStatus::Failed => {
                let reason = backend.error.as_deref().unwrap_or("unknown error");
                let _ = writeln!(out, "  {:<8} failed     {reason}", id.as_str());
            }
        }
    }

    if let Some(ref error) = result.error {
        let _ = writeln!(out, "Search failed: {error}");
        return out;
    }

    let _ = writeln!(
        out,
        "Found {} record(s), {} unique (dedup {:.1}%)",
        result.total_found(),
        result.merged_count(),
        result.dedup_ratio() * 100.0
    );
    for record in result.merged_records.iter().take(SUMMARY_RECORD_LIMIT) {
        let sources: Vec<&str> = record.source_databases.iter().map(DatabaseId::as_str).collect();
        let _ = writeln!(
            out,
            "  {:<14} {}  [{}]",
            record.patent_number,
            record.title,
            sources.join(", ")
        );
    }
    if result.merged_count() > SUMMARY_RECORD_LIMIT {
        let _ = writeln!(out, "  ... and {} more", result.merged_count() - SUMMARY_RECORD_LIMIT);
    }
    out
}

/// Map a failed run to an error for the process exit status.
///
/// # Errors
///
/// Returns [`HubError::SearchFailed`] carrying the run-level error.
pub fn ensure_completed(result: &CoordinationResult) -> Result<()> {
    if result.is_completed() {
        return Ok(());
    }
    let error = result.error.as_deref().unwrap_or("unknown error");
    Err(HubError::SearchFailed(error.to_owned()))
}
