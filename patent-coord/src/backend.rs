//! Trait definition for pluggable patent-search backends.
//!
//! Each backend (a scraper bot, a remote service, a local fixture) implements
//! [`BackendCapability`] and is registered under a database id. The
//! coordinator never inspects backend internals, only the
//! [`BackendResponse`] shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::config::SearchOptions;
use crate::error::CoordError;
use crate::query::SearchQuery;
use crate::types::{BackendStatus, PatentRecord};

/// What every backend receives for one coordination run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRequest {
    pub keywords: Option<Vec<String>>,
    pub patent_number: Option<String>,
    pub options: SearchOptions,
}

impl From<&SearchQuery> for BackendRequest {
    fn from(query: &SearchQuery) -> Self {
        Self {
            keywords: query.keywords.clone(),
            patent_number: query.patent_number.clone(),
            options: query.options.clone(),
        }
    }
}

/// The result shape a backend reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub status: BackendStatus,
    #[serde(default)]
    pub results: Vec<PatentRecord>,
    #[serde(default)]
    pub downloaded_files: Vec<PathBuf>,
    #[serde(default)]
    pub error: Option<String>,
    /// Backend-measured execution time in seconds.
    #[serde(default)]
    pub execution_time: f64,
}

impl BackendResponse {
    pub fn completed(results: Vec<PatentRecord>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: BackendStatus::Failed,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// A pluggable patent-search backend.
///
/// Implementations may report failure either by returning `Err` or by
/// returning a response whose `status` is `failed`; both end up as a failed
/// backend result. Implementations should watch `cancel` during long
/// operations, but the coordinator also enforces cancellation and deadlines
/// from the outside.
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
#[async_trait]
pub trait BackendCapability: Send + Sync {
    /// Human-readable backend name used in logs.
    fn name(&self) -> &str;

    /// Run one search.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError`] if the backend cannot complete the search.
    async fn search(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendResponse, CoordError>;
}
