//! The logical query fanned out to every requested database.

use serde::{Deserialize, Serialize};

use crate::config::SearchOptions;
use crate::error::CoordError;
use crate::types::{DatabaseId, ExecutionMode};

/// One logical patent search across several databases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keywords: Option<Vec<String>>,
    pub patent_number: Option<String>,
    /// Requested databases, in request order. Duplicates are ignored.
    pub target_databases: Vec<DatabaseId>,
    #[serde(default)]
    pub options: SearchOptions,
    #[serde(default)]
    pub mode: ExecutionMode,
}

impl SearchQuery {
    /// A keyword query against `databases`.
    pub fn keywords<I, S>(databases: &[DatabaseId], keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: Some(keywords.into_iter().map(Into::into).collect()),
            target_databases: databases.to_vec(),
            ..Default::default()
        }
    }

    /// A patent-number lookup against `databases`.
    pub fn patent_number(databases: &[DatabaseId], number: impl Into<String>) -> Self {
        Self {
            patent_number: Some(number.into()),
            target_databases: databases.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Checks the caller-side invariants of a query.
    ///
    /// At least one non-blank keyword or a non-blank patent number is
    /// required, and the options must be valid. The coordinator itself does
    /// not call this; an invalid query simply yields whatever the backends
    /// make of it.
    pub fn validate(&self) -> Result<(), CoordError> {
        let has_keywords = self
            .keywords
            .as_ref()
            .is_some_and(|words| words.iter().any(|w| !w.trim().is_empty()));
        let has_number = self
            .patent_number
            .as_ref()
            .is_some_and(|n| !n.trim().is_empty());
        if !has_keywords && !has_number {
            return Err(CoordError::Config(
                "either keywords or a patent number must be provided".into(),
            ));
        }
        self.options.validate()
    }

    /// Requested databases with duplicates removed, first occurrence kept.
    pub fn unique_databases(&self) -> Vec<DatabaseId> {
        let mut seen = std::collections::HashSet::new();
        self.target_databases
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }
}
