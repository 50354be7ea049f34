//! A backend that serves a fixed response.
//!
//! Used for offline runs, demos and tests. The response can be built in
//! memory or loaded from a JSON file in the backend wire shape.

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendCapability, BackendRequest, BackendResponse};
use crate::error::CoordError;
use crate::orchestrator::fingerprint::normalize_patent_number;
use crate::types::{BackendStatus, PatentRecord};

/// Serves the same canned response to every search.
///
/// For a patent-number query only records whose normalised number matches
/// are returned. Completed responses are truncated to
/// `options.max_results_per_db`.
#[derive(Debug, Clone)]
pub struct FixtureBackend {
    name: String,
    response: BackendResponse,
}

impl FixtureBackend {
    pub fn new(name: impl Into<String>, response: BackendResponse) -> Self {
        Self {
            name: name.into(),
            response,
        }
    }

    pub fn from_records(name: impl Into<String>, records: Vec<PatentRecord>) -> Self {
        Self::new(name, BackendResponse::completed(records))
    }

    /// Load a response from a JSON file.
    ///
    /// The file holds either a full response object or a bare array of
    /// records.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::Io`] if the file cannot be read, or
    /// [`CoordError::Config`] if it is not valid JSON of either shape.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self, CoordError> {
        let content = std::fs::read_to_string(path)?;
        let response = match serde_json::from_str::<BackendResponse>(&content) {
            Ok(response) => response,
            Err(_) => serde_json::from_str::<Vec<PatentRecord>>(&content)
                .map(BackendResponse::completed)
                .map_err(|e| {
                    CoordError::Config(format!("invalid fixture {}: {e}", path.display()))
                })?,
        };
        Ok(Self::new(name, response))
    }
}

#[async_trait]
impl BackendCapability for FixtureBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendResponse, CoordError> {
        if cancel.is_cancelled() {
            return Err(CoordError::Cancelled("search".to_owned()));
        }

        let mut response = self.response.clone();
        if response.status == BackendStatus::Completed {
            if let Some(number) = request.patent_number.as_deref() {
                let wanted = normalize_patent_number(number);
                response
                    .results
                    .retain(|r| normalize_patent_number(&r.patent_number) == wanted);
            }
            response.results.truncate(request.options.max_results_per_db);
        }
        Ok(response)
    }
}
