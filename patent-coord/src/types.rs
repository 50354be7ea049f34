//! Core types for patent records, backend results and coordination snapshots.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::backend::BackendResponse;
use crate::orchestrator::stats::Statistics;

/// Identifier of a patent database as requested by a caller.
///
/// Ids are open-ended: any string may be requested, and only ids with a
/// registered backend are executed. Ids are trimmed and lowercased on
/// construction so `"USPTO"` and `"uspto "` name the same database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DatabaseId(String);

impl DatabaseId {
    /// Create a database id, normalising case and surrounding whitespace.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    /// The normalised id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatabaseId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DatabaseId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<DatabaseId> for String {
    fn from(id: DatabaseId) -> Self {
        id.0
    }
}

impl From<PatentDatabase> for DatabaseId {
    fn from(db: PatentDatabase) -> Self {
        Self(db.id().to_owned())
    }
}

/// Patent offices the system knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatentDatabase {
    /// Taiwan Patent Search System.
    Twpat,
    /// United States Patent and Trademark Office.
    Uspto,
    /// European Patent Office.
    Epo,
    /// World Intellectual Property Organization.
    Wipo,
    /// Japan Patent Office.
    Jpo,
    /// China National Intellectual Property Administration.
    Cnipa,
    /// Korean Intellectual Property Office.
    Kipo,
}

impl PatentDatabase {
    /// The machine-readable database id.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Twpat => "twpat",
            Self::Uspto => "uspto",
            Self::Epo => "epo",
            Self::Wipo => "wipo",
            Self::Jpo => "jpo",
            Self::Cnipa => "cnipa",
            Self::Kipo => "kipo",
        }
    }

    /// Returns the human-readable name of this office.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Twpat => "Taiwan Patent Search System",
            Self::Uspto => "USPTO",
            Self::Epo => "European Patent Office",
            Self::Wipo => "WIPO",
            Self::Jpo => "Japan Patent Office",
            Self::Cnipa => "CNIPA",
            Self::Kipo => "KIPO",
        }
    }

    /// Returns all known offices.
    pub fn all() -> &'static [PatentDatabase] {
        &[
            Self::Twpat,
            Self::Uspto,
            Self::Epo,
            Self::Wipo,
            Self::Jpo,
            Self::Cnipa,
            Self::Kipo,
        ]
    }
}

impl fmt::Display for PatentDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PatentDatabase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|db| db.id() == wanted)
            .ok_or_else(|| format!("unknown patent database: {s}"))
    }
}

/// A single patent as reported by a backend, or as merged across backends.
///
/// Multi-valued fields are sets: duplicates collapse and element order is
/// not significant. `source_databases` is filled in by the merge engine, so
/// backends may leave it empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentRecord {
    #[serde(default)]
    pub patent_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub claims: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inventors: BTreeSet<String>,
    #[serde(default)]
    pub applicants: BTreeSet<String>,
    #[serde(default)]
    pub ipc_classes: BTreeSet<String>,
    /// Image URLs.
    #[serde(default)]
    pub images: BTreeSet<String>,
    #[serde(default)]
    pub source_databases: BTreeSet<DatabaseId>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl PatentRecord {
    /// Create a record with just a number and title.
    pub fn new(patent_number: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            patent_number: patent_number.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Outcome of one backend invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    #[default]
    Completed,
    Failed,
}

/// The result of running one backend for one database.
///
/// Created once per backend call and never mutated afterwards. Failed
/// results carry no records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendResult {
    pub database_id: DatabaseId,
    pub status: BackendStatus,
    pub records: Vec<PatentRecord>,
    pub downloaded_artifacts: Vec<PathBuf>,
    pub error: Option<String>,
    #[serde(rename = "execution_time", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl BackendResult {
    /// Build a result from what a backend returned.
    ///
    /// A response whose own status is `failed` becomes a failed result; its
    /// records are dropped but its downloaded files are kept.
    pub fn from_response(database_id: DatabaseId, response: BackendResponse, elapsed: Duration) -> Self {
        match response.status {
            BackendStatus::Completed => Self {
                database_id,
                status: BackendStatus::Completed,
                records: response.results,
                downloaded_artifacts: response.downloaded_files,
                error: None,
                elapsed,
            },
            BackendStatus::Failed => Self {
                database_id,
                status: BackendStatus::Failed,
                records: Vec::new(),
                downloaded_artifacts: response.downloaded_files,
                error: Some(
                    response
                        .error
                        .unwrap_or_else(|| "backend reported failure".to_owned()),
                ),
                elapsed,
            },
        }
    }

    /// A failed result carrying `error`.
    pub fn failed(database_id: DatabaseId, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            database_id,
            status: BackendStatus::Failed,
            records: Vec::new(),
            downloaded_artifacts: Vec::new(),
            error: Some(error.into()),
            elapsed,
        }
    }

    /// The result recorded for an id with no registered backend.
    pub fn unsupported(database_id: DatabaseId) -> Self {
        let error = crate::error::CoordError::UnsupportedDatabase(database_id.clone()).to_string();
        Self::failed(database_id, error, Duration::ZERO)
    }

    pub fn is_completed(&self) -> bool {
        self.status == BackendStatus::Completed
    }

    /// Number of records this result contributes to totals (0 when failed).
    pub fn contributed_count(&self) -> usize {
        if self.is_completed() {
            self.records.len()
        } else {
            0
        }
    }
}

/// Execution strategy for a coordination run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One concurrent unit per requested database.
    #[default]
    Parallel,
    /// One backend at a time, in request order.
    Sequential,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parallel => f.write_str("parallel"),
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

/// Terminal status of a coordination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationStatus {
    Completed,
    Failed,
}

/// The terminal artifact of one coordination run.
///
/// Callers always receive one of these, even when every backend failed.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationResult {
    pub status: CoordinationStatus,
    /// Run-level error; `None` unless `status` is `Failed`.
    pub error: Option<String>,
    pub databases_searched: Vec<DatabaseId>,
    pub statistics: Statistics,
    pub merged_records: Vec<PatentRecord>,
    pub per_database_results: BTreeMap<DatabaseId, BackendResult>,
    /// Union of every backend's downloaded files, in database order.
    pub downloaded_artifacts: Vec<PathBuf>,
    #[serde(rename = "execution_time", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub execution_log: Vec<String>,
}

impl CoordinationResult {
    pub fn is_completed(&self) -> bool {
        self.status == CoordinationStatus::Completed
    }

    pub fn total_found(&self) -> usize {
        self.statistics.total_found
    }

    pub fn merged_count(&self) -> usize {
        self.statistics.merged_count
    }

    pub fn dedup_ratio(&self) -> f64 {
        self.statistics.dedup_ratio
    }

    pub fn per_database_counts(&self) -> &BTreeMap<DatabaseId, usize> {
        &self.statistics.per_database_counts
    }
}

fn serialize_secs<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
