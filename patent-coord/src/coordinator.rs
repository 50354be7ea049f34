//! Top-level coordination: execute, merge, derive statistics.
//!
//! # State Machine
//!
//! ```text
//! ┌────────────┐  coordinate()  ┌─────────┐  all units done, merged  ┌───────────┐
//! │ NotStarted ├───────────────►│ Running ├─────────────────────────►│ Completed │
//! └────────────┘                └────┬────┘                          └───────────┘
//!                                    │  run-level error / cancelled  ┌───────────┐
//!                                    └──────────────────────────────►│  Failed   │
//!                                                                    └───────────┘
//! ```
//!
//! Individual backend failures never leave `Running` on their own; they are
//! isolated into failed backend results. Every call to
//! [`Coordinator::coordinate`] starts a fresh run with fresh accumulation
//! state and yields exactly one [`CoordinationResult`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::backend::BackendRequest;
use crate::config::{CoordinatorConfig, MergeOrder};
use crate::error::{CoordError, Result};
use crate::orchestrator::collector::ExecutionLog;
use crate::orchestrator::execution::{execute, ExecutionOutcome};
use crate::orchestrator::merge::{merge_records, working_sequence};
use crate::orchestrator::stats::{collect_statistics, Statistics};
use crate::query::SearchQuery;
use crate::registry::BackendRegistry;
use crate::types::{
    BackendResult, CoordinationResult, CoordinationStatus, DatabaseId, PatentRecord,
};

/// Lifecycle state of one coordination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Fans queries out to registered backends and merges what comes back.
///
/// Cheap to clone; clones share the registry.
#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: Arc<BackendRegistry>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Create a coordinator over `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::Config`] if `config` is invalid.
    pub fn new(registry: BackendRegistry, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: Arc::new(registry),
            config,
        })
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run `query` to completion.
    pub async fn coordinate(&self, query: SearchQuery) -> CoordinationResult {
        self.coordinate_with_cancel(query, CancellationToken::new())
            .await
    }

    /// Run `query`, aborting outstanding backend calls when `cancel` fires.
    ///
    /// A cancelled run still returns a result: status `Failed`, error
    /// `"coordination cancelled"`, with whatever per-database results and log
    /// entries were gathered.
    pub async fn coordinate_with_cancel(
        &self,
        query: SearchQuery,
        cancel: CancellationToken,
    ) -> CoordinationResult {
        CoordinationRun::new(self, query, cancel).run().await
    }
}

/// Accumulation state for exactly one run. Consumed by [`CoordinationRun::run`].
struct CoordinationRun<'a> {
    coordinator: &'a Coordinator,
    query: SearchQuery,
    cancel: CancellationToken,
    state: RunState,
    started: Instant,
}

impl<'a> CoordinationRun<'a> {
    fn new(coordinator: &'a Coordinator, query: SearchQuery, cancel: CancellationToken) -> Self {
        Self {
            coordinator,
            query,
            cancel,
            state: RunState::NotStarted,
            started: Instant::now(),
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "coordination state change");
        self.state = next;
    }

    async fn run(mut self) -> CoordinationResult {
        self.transition(RunState::Running);
        self.started = Instant::now();

        let databases = self.query.unique_databases();
        let mut log = ExecutionLog::new();
        let names: Vec<&str> = databases.iter().map(DatabaseId::as_str).collect();
        let entry = format!("starting multi-database search: {}", names.join(", "));
        tracing::info!(mode = %self.query.mode, "{entry}");
        log.push(entry);
        if databases.len() < self.query.target_databases.len() {
            log.push("ignored duplicate database ids in request");
        }

        let executed = execute(
            &self.coordinator.registry,
            &databases,
            BackendRequest::from(&self.query),
            self.query.mode,
            &self.coordinator.config,
            &self.cancel,
            log,
        )
        .await;

        let outcome = match executed {
            Ok(outcome) => outcome,
            Err(err) => {
                return self.fail(&databases, err, ExecutionLog::new(), BTreeMap::new());
            }
        };

        let ExecutionOutcome {
            results,
            arrival_order,
            mut log,
            failure,
        } = outcome;

        if let Some(err) = failure {
            return self.fail(&databases, err, log, results);
        }
        if self.cancel.is_cancelled() && interrupted(&results) {
            let err = CoordError::Cancelled("coordination".to_owned());
            return self.fail(&databases, err, log, results);
        }

        let order = merge_order(
            self.coordinator.config.merge_order,
            &databases,
            &arrival_order,
        );
        let working = working_sequence(&results, &order);
        log.push("merging and deduplicating results");
        tracing::info!(records = working.len(), "merging and deduplicating results");
        let total = working.len();
        let merged = guarded_merge(&mut log, move || merge_records(working)).await;
        log.push(format!("deduplication complete: {total} -> {}", merged.len()));

        let statistics = collect_statistics(&results, merged.len());
        let entry = format!(
            "multi-database search completed: {} unique patents",
            merged.len()
        );
        tracing::info!(
            total_found = statistics.total_found,
            merged = statistics.merged_count,
            dedup_ratio = statistics.dedup_ratio,
            "{entry}"
        );
        log.push(entry);

        self.transition(RunState::Completed);
        CoordinationResult {
            status: CoordinationStatus::Completed,
            error: None,
            databases_searched: databases,
            statistics,
            merged_records: merged,
            downloaded_artifacts: union_artifacts(&results, &order),
            per_database_results: results,
            elapsed: self.started.elapsed(),
            execution_log: log.into_entries(),
        }
    }

    fn fail(
        mut self,
        databases: &[DatabaseId],
        err: CoordError,
        mut log: ExecutionLog,
        results: BTreeMap<DatabaseId, BackendResult>,
    ) -> CoordinationResult {
        let entry = format!("multi-database search failed: {err}");
        tracing::error!("{entry}");
        log.push(entry);
        self.transition(RunState::Failed);

        let elapsed = self.started.elapsed();
        CoordinationResult {
            status: CoordinationStatus::Failed,
            error: Some(err.to_string()),
            databases_searched: databases.to_vec(),
            statistics: Statistics::default(),
            merged_records: Vec::new(),
            downloaded_artifacts: Vec::new(),
            per_database_results: results,
            elapsed,
            execution_log: log.into_entries(),
        }
    }
}

/// Whether any unit was cut short by cancellation. A token that fires after
/// every unit finished leaves the run complete.
fn interrupted(results: &BTreeMap<DatabaseId, BackendResult>) -> bool {
    let cancelled = CoordError::Cancelled("search".to_owned()).to_string();
    results
        .values()
        .any(|result| result.error.as_deref() == Some(cancelled.as_str()))
}

/// The database order the merge pass walks.
fn merge_order(order: MergeOrder, requested: &[DatabaseId], arrival: &[DatabaseId]) -> Vec<DatabaseId> {
    match order {
        MergeOrder::Request => requested.to_vec(),
        MergeOrder::Arrival => arrival.to_vec(),
        MergeOrder::DatabaseId => {
            let mut sorted = requested.to_vec();
            sorted.sort();
            sorted
        }
    }
}

fn union_artifacts(
    results: &BTreeMap<DatabaseId, BackendResult>,
    order: &[DatabaseId],
) -> Vec<PathBuf> {
    order
        .iter()
        .filter_map(|id| results.get(id))
        .flat_map(|result| result.downloaded_artifacts.iter().cloned())
        .collect()
}

/// Run `work` on the blocking pool; a panic degrades to an empty merge.
pub(crate) async fn guarded_merge<F>(log: &mut ExecutionLog, work: F) -> Vec<PatentRecord>
where
    F: FnOnce() -> Vec<PatentRecord> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(merged) => merged,
        Err(join_err) => {
            let err = CoordError::Merge(join_err.to_string());
            let entry = format!("merging and deduplicating results failed: {err}");
            tracing::error!("{entry}");
            log.push(entry);
            Vec::new()
        }
    }
}

/// A token that cancels itself after `deadline`, for bounding a whole run
/// via [`Coordinator::coordinate_with_cancel`].
pub fn deadline_token(deadline: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = child.cancelled() => {}
            () = tokio::time::sleep(deadline) => child.cancel(),
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::FixtureBackend;

    fn ids(raw: &[&str]) -> Vec<DatabaseId> {
        raw.iter().map(|id| DatabaseId::new(id)).collect()
    }

    #[test]
    fn invalid_config_rejected() {
        let config = CoordinatorConfig {
            backend_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(Coordinator::new(BackendRegistry::new(), config).is_err());
    }

    #[test]
    fn merge_order_variants() {
        let requested = ids(&["uspto", "epo", "twpat"]);
        let arrival = ids(&["twpat", "uspto", "epo"]);
        assert_eq!(merge_order(MergeOrder::Request, &requested, &arrival), requested);
        assert_eq!(merge_order(MergeOrder::Arrival, &requested, &arrival), arrival);
        assert_eq!(
            merge_order(MergeOrder::DatabaseId, &requested, &arrival),
            ids(&["epo", "twpat", "uspto"])
        );
    }

    #[tokio::test]
    async fn guarded_merge_degrades_panic_to_empty() {
        let mut log = ExecutionLog::new();
        let merged = guarded_merge(&mut log, || -> Vec<PatentRecord> {
            panic!("malformed record");
        })
        .await;
        assert!(merged.is_empty());
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].starts_with("merging and deduplicating results failed: merge error"));
    }

    #[tokio::test]
    async fn guarded_merge_passes_result_through() {
        let mut log = ExecutionLog::new();
        let merged = guarded_merge(&mut log, || vec![PatentRecord::new("US1", "A")]).await;
        assert_eq!(merged.len(), 1);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn empty_request_completes_with_zero_totals() {
        let coordinator =
            Coordinator::new(BackendRegistry::new(), CoordinatorConfig::default()).expect("valid");
        let result = coordinator
            .coordinate(SearchQuery::keywords(&[], ["widget"]))
            .await;
        assert!(result.is_completed());
        assert_eq!(result.total_found(), 0);
        assert_eq!(result.merged_count(), 0);
        assert!((result.dedup_ratio() - 0.0).abs() < f64::EPSILON);
        assert!(result.per_database_results.is_empty());
        assert!(!result.execution_log.is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_run_once() {
        let mut registry = BackendRegistry::new();
        registry.register(
            "uspto",
            FixtureBackend::from_records("uspto", vec![PatentRecord::new("US1", "A")]),
        );
        let coordinator = Coordinator::new(registry, CoordinatorConfig::default()).expect("valid");
        let result = coordinator
            .coordinate(SearchQuery::keywords(&ids(&["uspto", "USPTO"]), ["a"]))
            .await;
        assert_eq!(result.databases_searched, ids(&["uspto"]));
        assert_eq!(result.total_found(), 1);
        assert!(result
            .execution_log
            .iter()
            .any(|e| e == "ignored duplicate database ids in request"));
    }

    /// Cancels the run token on its way out, after producing its results.
    struct LateCancelBackend {
        token: CancellationToken,
    }

    #[async_trait::async_trait]
    impl crate::backend::BackendCapability for LateCancelBackend {
        fn name(&self) -> &str {
            "late"
        }

        async fn search(
            &self,
            _request: &BackendRequest,
            _cancel: &CancellationToken,
        ) -> Result<crate::backend::BackendResponse> {
            self.token.cancel();
            Ok(crate::backend::BackendResponse::completed(vec![PatentRecord::new(
                "US5", "Late",
            )]))
        }
    }

    #[tokio::test]
    async fn cancel_after_units_finish_keeps_run_completed() {
        let cancel = CancellationToken::new();
        let mut registry = BackendRegistry::new();
        registry.register(
            "uspto",
            LateCancelBackend {
                token: cancel.clone(),
            },
        );
        let coordinator = Coordinator::new(registry, CoordinatorConfig::default()).expect("valid");
        let result = coordinator
            .coordinate_with_cancel(SearchQuery::keywords(&ids(&["uspto"]), ["late"]), cancel.clone())
            .await;
        assert!(cancel.is_cancelled());
        assert!(result.is_completed());
        assert_eq!(result.merged_count(), 1);
    }

    #[tokio::test]
    async fn cancel_before_start_fails_run() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut registry = BackendRegistry::new();
        registry.register(
            "uspto",
            FixtureBackend::from_records("uspto", vec![PatentRecord::new("US1", "A")]),
        );
        let coordinator = Coordinator::new(registry, CoordinatorConfig::default()).expect("valid");
        let result = coordinator
            .coordinate_with_cancel(SearchQuery::keywords(&ids(&["uspto"]), ["a"]), cancel)
            .await;
        assert_eq!(result.status, CoordinationStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("coordination cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_token_fires() {
        let token = deadline_token(Duration::from_secs(3));
        assert!(!token.is_cancelled());
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(token.is_cancelled());
    }
}
