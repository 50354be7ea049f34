//! Coordination and search configuration with sensible defaults.
//!
//! [`CoordinatorConfig`] controls how backends are scheduled and how their
//! results are ordered before merging. [`SearchOptions`] is forwarded
//! untouched to every backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoordError;

/// Upper bound accepted for [`SearchOptions::max_results_per_db`].
pub const MAX_RESULTS_PER_DB_LIMIT: usize = 1000;

/// Order in which completed backend results are flattened before merging.
///
/// The merge keeps the first non-empty scalar it sees, so this order decides
/// which backend "wins" a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// The order databases were requested in, for both execution modes.
    #[default]
    Request,
    /// Sorted by database id.
    DatabaseId,
    /// Completion order of the backends. Not reproducible in parallel mode.
    Arrival,
}

/// Configuration for a [`crate::Coordinator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Deadline for each backend call, in seconds.
    pub backend_timeout_seconds: u64,
    /// Maximum number of backends running at once in parallel mode.
    /// `None` runs one worker per requested database.
    pub max_concurrency: Option<usize>,
    pub merge_order: MergeOrder,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            backend_timeout_seconds: 120,
            max_concurrency: None,
            merge_order: MergeOrder::Request,
        }
    }
}

impl CoordinatorConfig {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_seconds)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.backend_timeout_seconds == 0 {
            return Err(CoordError::Config(
                "backend_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_concurrency == Some(0) {
            return Err(CoordError::Config(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Inclusive publication date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Options forwarded to every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results_per_db: usize,
    pub include_full_text: bool,
    pub include_images: bool,
    pub date_range: Option<DateRange>,
    /// IPC class filter; empty means no filter.
    pub ipc_classes: Vec<String>,
    pub language_preference: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results_per_db: 100,
            include_full_text: true,
            include_images: true,
            date_range: None,
            ipc_classes: Vec::new(),
            language_preference: vec!["zh-TW".to_owned(), "en".to_owned()],
        }
    }
}

impl SearchOptions {
    /// Validates these options.
    ///
    /// Checks:
    /// - `max_results_per_db` must be in `1..=1000`
    /// - `date_range.start` must not be after `date_range.end`
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.max_results_per_db == 0 || self.max_results_per_db > MAX_RESULTS_PER_DB_LIMIT {
            return Err(CoordError::Config(format!(
                "max_results_per_db must be between 1 and {MAX_RESULTS_PER_DB_LIMIT}"
            )));
        }
        if let Some(DateRange {
            start: Some(start),
            end: Some(end),
        }) = self.date_range
        {
            if start > end {
                return Err(CoordError::Config(
                    "date_range start must not be after end".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_coordinator_config_is_valid() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.backend_timeout_seconds, 120);
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.merge_order, MergeOrder::Request);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = CoordinatorConfig {
            backend_timeout_seconds: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend_timeout_seconds"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = CoordinatorConfig {
            max_concurrency: Some(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));
    }

    #[test]
    fn default_search_options() {
        let options = SearchOptions::default();
        assert_eq!(options.max_results_per_db, 100);
        assert!(options.include_full_text);
        assert!(options.include_images);
        assert!(options.ipc_classes.is_empty());
        assert_eq!(options.language_preference, vec!["zh-TW", "en"]);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn max_results_bounds() {
        let too_few = SearchOptions {
            max_results_per_db: 0,
            ..Default::default()
        };
        assert!(too_few.validate().is_err());

        let too_many = SearchOptions {
            max_results_per_db: 1001,
            ..Default::default()
        };
        assert!(too_many.validate().is_err());

        let edge = SearchOptions {
            max_results_per_db: 1000,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn inverted_date_range_rejected() {
        let options = SearchOptions {
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2024, 6, 1),
                end: NaiveDate::from_ymd_opt(2023, 1, 1),
            }),
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("date_range"));
    }

    #[test]
    fn open_ended_date_range_valid() {
        let options = SearchOptions {
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2020, 1, 1),
                end: None,
            }),
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn merge_order_serde_is_snake_case() {
        let json = serde_json::to_string(&MergeOrder::DatabaseId).expect("serialize");
        assert_eq!(json, "\"database_id\"");
    }

    #[test]
    fn partial_options_fill_defaults() {
        let options: SearchOptions =
            serde_json::from_str(r#"{"max_results_per_db": 5}"#).expect("deserialize");
        assert_eq!(options.max_results_per_db, 5);
        assert!(options.include_images);
    }
}
