//! # patent-coord
//!
//! Multi-database patent search coordination.
//!
//! One logical query is fanned out to several patent database backends.
//! Each backend runs in isolation, and its failure, timeout or panic is
//! recorded without aborting the others. Completed results are then merged
//! into fingerprint-unique records along with run statistics.
//!
//! ## Design
//!
//! - Backends implement [`BackendCapability`] and are looked up through a
//!   [`BackendRegistry`] keyed by [`DatabaseId`]
//! - Parallel or sequential execution, with a per-call timeout and an
//!   optional concurrency cap
//! - A single collector task owns the execution log and the result map
//! - Records are deduplicated by an MD5 digest of the normalized patent
//!   number and title; sets are unioned, missing text is filled forward
//! - Results can be exported as JSON or CSV
//!
//! ## Security
//!
//! - API keys for remote backends are never logged or exported
//! - No network listeners; this is a library, not a server

pub mod backend;
pub mod backends;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod query;
pub mod registry;
pub mod types;

pub use backend::{BackendCapability, BackendRequest, BackendResponse};
pub use config::{CoordinatorConfig, DateRange, MergeOrder, SearchOptions};
pub use coordinator::{deadline_token, Coordinator, RunState};
pub use error::{CoordError, Result};
pub use export::{export, ExportFormat};
pub use orchestrator::fingerprint::Fingerprint;
pub use orchestrator::stats::Statistics;
pub use query::SearchQuery;
pub use registry::BackendRegistry;
pub use types::{
    BackendResult, BackendStatus, CoordinationResult, CoordinationStatus, DatabaseId,
    ExecutionMode, PatentDatabase, PatentRecord,
};

/// Coordinate `query` across `registry` with default configuration.
///
/// Convenience wrapper around [`Coordinator::coordinate`] using
/// [`CoordinatorConfig::default()`].
///
/// # Errors
///
/// Never fails for the default configuration; the `Result` covers
/// coordinator construction.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> patent_coord::Result<()> {
/// use patent_coord::{BackendRegistry, DatabaseId, SearchQuery};
///
/// let registry = BackendRegistry::new();
/// let query = SearchQuery::keywords(&[DatabaseId::new("twpat")], ["widget"]);
/// let result = patent_coord::coordinate(registry, query).await?;
/// println!("{} unique patents", result.merged_count());
/// # Ok(())
/// # }
/// ```
pub async fn coordinate(registry: BackendRegistry, query: SearchQuery) -> Result<CoordinationResult> {
    let coordinator = Coordinator::new(registry, CoordinatorConfig::default())?;
    Ok(coordinator.coordinate(query).await)
}
