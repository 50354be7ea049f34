//! Execution strategy: parallel fan-out or sequential walk over backends.
//!
//! Every backend call runs inside a unit that enforces the per-backend
//! deadline, the run's cancellation token, and panic isolation. Whatever
//! happens inside a unit comes out as a [`BackendResult`]; it never aborts
//! sibling units or the run.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendCapability, BackendRequest};
use crate::config::CoordinatorConfig;
use crate::error::CoordError;
use crate::registry::BackendRegistry;
use crate::types::{BackendResult, DatabaseId, ExecutionMode};

use super::collector::{spawn_collector, ExecutionLog, RunSink};

/// What the execution phase hands to the merge phase.
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// One entry per requested database, including unsupported ones.
    pub results: BTreeMap<DatabaseId, BackendResult>,
    /// Database ids in the order their results arrived.
    pub arrival_order: Vec<DatabaseId>,
    pub log: ExecutionLog,
    /// Set when a worker died outside its unit boundary.
    pub failure: Option<CoordError>,
}

/// Run the backends for `databases` and collect one result per id.
///
/// Completes only once every dispatched unit has finished. `log` is seeded
/// into the collector so the trace stays one ordered sequence.
///
/// # Errors
///
/// Returns [`CoordError::Internal`] if the collector task itself is lost,
/// in which case the accumulated log is lost with it.
pub async fn execute(
    registry: &BackendRegistry,
    databases: &[DatabaseId],
    request: BackendRequest,
    mode: ExecutionMode,
    config: &CoordinatorConfig,
    cancel: &CancellationToken,
    log: ExecutionLog,
) -> Result<ExecutionOutcome, CoordError> {
    let (sink, collector) = spawn_collector(log);
    let request = Arc::new(request);

    let failure = match mode {
        ExecutionMode::Parallel => {
            sink.info("using parallel mode".to_owned());
            run_parallel(registry, databases, &request, config, cancel, &sink).await
        }
        ExecutionMode::Sequential => {
            sink.info("using sequential mode".to_owned());
            run_sequential(registry, databases, &request, config, cancel, &sink).await;
            None
        }
    };
    drop(sink);

    let collected = collector
        .await
        .map_err(|e| CoordError::Internal(format!("result collector failed: {e}")))?;

    Ok(ExecutionOutcome {
        results: collected.results,
        arrival_order: collected.arrival_order,
        log: collected.log,
        failure,
    })
}

async fn run_parallel(
    registry: &BackendRegistry,
    databases: &[DatabaseId],
    request: &Arc<BackendRequest>,
    config: &CoordinatorConfig,
    cancel: &CancellationToken,
    sink: &RunSink,
) -> Option<CoordError> {
    let limiter = config.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
    let timeout = config.backend_timeout();
    let mut units = JoinSet::new();

    for id in databases {
        let Some(backend) = registry.lookup(id) else {
            record_unsupported(id, sink);
            continue;
        };
        let id = id.clone();
        let request = Arc::clone(request);
        let cancel = cancel.clone();
        let sink = sink.clone();
        let limiter = limiter.clone();
        units.spawn(async move {
            let _permit = match limiter {
                Some(limiter) => limiter.acquire_owned().await.ok(),
                None => None,
            };
            run_unit(id, backend, request, timeout, cancel, sink).await;
        });
    }

    let mut failure = None;
    while let Some(joined) = units.join_next().await {
        if let Err(err) = joined {
            sink.warn(format!("search worker terminated abnormally: {err}"));
            failure.get_or_insert(CoordError::Internal(format!(
                "search worker terminated abnormally: {err}"
            )));
        }
    }
    failure
}

async fn run_sequential(
    registry: &BackendRegistry,
    databases: &[DatabaseId],
    request: &Arc<BackendRequest>,
    config: &CoordinatorConfig,
    cancel: &CancellationToken,
    sink: &RunSink,
) {
    let timeout = config.backend_timeout();
    for id in databases {
        let Some(backend) = registry.lookup(id) else {
            record_unsupported(id, sink);
            continue;
        };
        run_unit(
            id.clone(),
            backend,
            Arc::clone(request),
            timeout,
            cancel.clone(),
            sink.clone(),
        )
        .await;
    }
}

fn record_unsupported(id: &DatabaseId, sink: &RunSink) {
    sink.warn(format!("unsupported database: {id}"));
    sink.finish(BackendResult::unsupported(id.clone()));
}

/// One backend call, start to finish, reported through `sink`.
async fn run_unit(
    id: DatabaseId,
    backend: Arc<dyn BackendCapability>,
    request: Arc<BackendRequest>,
    timeout: Duration,
    cancel: CancellationToken,
    sink: RunSink,
) {
    sink.info(format!("searching {id} ({})", backend.name()));

    let result = invoke(&id, backend.as_ref(), &request, timeout, &cancel).await;
    match &result.error {
        None => {
            tracing::debug!(
                database = %id,
                count = result.records.len(),
                elapsed_ms = result.elapsed.as_millis() as u64,
                "backend completed"
            );
            sink.info(format!("{id} search completed: {} results", result.records.len()));
        }
        Some(error) => {
            tracing::debug!(database = %id, %error, "backend failed");
            sink.warn(format!("{id} search failed: {error}"));
        }
    }
    sink.finish(result);
}

/// Call `backend` under the deadline, cancellation and panic guards.
async fn invoke(
    id: &DatabaseId,
    backend: &dyn BackendCapability,
    request: &BackendRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> BackendResult {
    let started = Instant::now();
    let call = AssertUnwindSafe(backend.search(request, cancel)).catch_unwind();

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoordError::Cancelled("search".to_owned())),
        timed = tokio::time::timeout(timeout, call) => match timed {
            Err(_) => Err(CoordError::Timeout(timeout.as_secs())),
            Ok(Err(panic)) => Err(CoordError::Panicked(panic_message(&*panic))),
            Ok(Ok(outcome)) => outcome,
        },
    };

    let elapsed = started.elapsed();
    match outcome {
        Ok(response) => BackendResult::from_response(id.clone(), response, elapsed),
        Err(err) => BackendResult::failed(id.clone(), err.to_string(), elapsed),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendResponse;
    use crate::backends::FixtureBackend;
    use crate::types::{BackendStatus, PatentRecord};
    use async_trait::async_trait;

    struct SlowBackend {
        delay: Duration,
    }

    #[async_trait]
    impl BackendCapability for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        async fn search(
            &self,
            _request: &BackendRequest,
            _cancel: &CancellationToken,
        ) -> Result<BackendResponse, CoordError> {
            tokio::time::sleep(self.delay).await;
            Ok(BackendResponse::completed(vec![PatentRecord::new("US1", "Slow")]))
        }
    }

    struct PanickingBackend;

    #[async_trait]
    impl BackendCapability for PanickingBackend {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn search(
            &self,
            _request: &BackendRequest,
            _cancel: &CancellationToken,
        ) -> Result<BackendResponse, CoordError> {
            panic!("selector not found");
        }
    }

    fn request() -> BackendRequest {
        BackendRequest {
            keywords: Some(vec!["widget".into()]),
            patent_number: None,
            options: Default::default(),
        }
    }

    fn ids(raw: &[&str]) -> Vec<DatabaseId> {
        raw.iter().map(|id| DatabaseId::new(id)).collect()
    }

    fn fixture(name: &str, n: usize) -> FixtureBackend {
        FixtureBackend::from_records(
            name,
            (0..n)
                .map(|i| PatentRecord::new(format!("{name}-{i}"), "t"))
                .collect(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_synthesises_failed_result() {
        let timeout = Duration::from_secs(5);
        let backend = SlowBackend {
            delay: Duration::from_secs(60),
        };
        let result = invoke(
            &DatabaseId::new("uspto"),
            &backend,
            &request(),
            timeout,
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.status, BackendStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("timed out after 5s"));
    }

    #[tokio::test]
    async fn panic_is_contained_at_unit_boundary() {
        let result = invoke(
            &DatabaseId::new("twpat"),
            &PanickingBackend,
            &request(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.status, BackendStatus::Failed);
        assert_eq!(
            result.error.as_deref(),
            Some("backend panicked: selector not found")
        );
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let backend = SlowBackend {
            delay: Duration::from_secs(1),
        };
        let result = invoke(
            &DatabaseId::new("epo"),
            &backend,
            &request(),
            Duration::from_secs(5),
            &cancel,
        )
        .await;
        assert_eq!(result.error.as_deref(), Some("search cancelled"));
    }

    #[tokio::test]
    async fn sequential_logs_in_request_order() {
        let mut registry = BackendRegistry::new();
        registry.register("uspto", fixture("uspto", 2));
        registry.register("twpat", fixture("twpat", 1));

        let outcome = execute(
            &registry,
            &ids(&["twpat", "epo", "uspto"]),
            request(),
            ExecutionMode::Sequential,
            &CoordinatorConfig::default(),
            &CancellationToken::new(),
            ExecutionLog::new(),
        )
        .await
        .expect("execute");

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.arrival_order, ids(&["twpat", "epo", "uspto"]));
        assert_eq!(
            outcome.log.entries(),
            [
                "using sequential mode",
                "searching twpat (twpat)",
                "twpat search completed: 1 results",
                "unsupported database: epo",
                "searching uspto (uspto)",
                "uspto search completed: 2 results",
            ]
        );
    }

    #[tokio::test]
    async fn parallel_collects_every_requested_database() {
        let mut registry = BackendRegistry::new();
        registry.register("uspto", fixture("uspto", 3));
        registry.register("twpat", fixture("twpat", 1));
        registry.register("jpo", PanickingBackend);

        let outcome = execute(
            &registry,
            &ids(&["uspto", "twpat", "jpo", "kipo"]),
            request(),
            ExecutionMode::Parallel,
            &CoordinatorConfig::default(),
            &CancellationToken::new(),
            ExecutionLog::new(),
        )
        .await
        .expect("execute");

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.arrival_order.len(), 4);
        assert!(outcome.results[&DatabaseId::new("uspto")].is_completed());
        assert!(outcome.results[&DatabaseId::new("twpat")].is_completed());
        assert!(!outcome.results[&DatabaseId::new("jpo")].is_completed());
        assert_eq!(
            outcome.results[&DatabaseId::new("kipo")].error.as_deref(),
            Some("unsupported database")
        );
    }

    #[tokio::test]
    async fn parallel_unit_logs_start_before_completion() {
        let mut registry = BackendRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(name, fixture(name, 1));
        }

        let outcome = execute(
            &registry,
            &ids(&["a", "b", "c"]),
            request(),
            ExecutionMode::Parallel,
            &CoordinatorConfig::default(),
            &CancellationToken::new(),
            ExecutionLog::new(),
        )
        .await
        .expect("execute");

        let entries = outcome.log.entries();
        for name in ["a", "b", "c"] {
            let start = entries
                .iter()
                .position(|e| e == &format!("searching {name} ({name})"))
                .expect("start entry");
            let done = entries
                .iter()
                .position(|e| e == &format!("{name} search completed: 1 results"))
                .expect("completion entry");
            assert!(start < done);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_limit_serialises_units() {
        let mut registry = BackendRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(
                name,
                SlowBackend {
                    delay: Duration::from_secs(10),
                },
            );
        }
        let config = CoordinatorConfig {
            max_concurrency: Some(1),
            backend_timeout_seconds: 15,
            ..Default::default()
        };

        let started = tokio::time::Instant::now();
        let outcome = execute(
            &registry,
            &ids(&["a", "b", "c"]),
            request(),
            ExecutionMode::Parallel,
            &config,
            &CancellationToken::new(),
            ExecutionLog::new(),
        )
        .await
        .expect("execute");

        assert!(outcome.results.values().all(BackendResult::is_completed));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let static_payload: Box<dyn Any + Send> = Box::new("static");
        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other_payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*static_payload), "static");
        assert_eq!(panic_message(&*owned_payload), "owned");
        assert_eq!(panic_message(&*other_payload), "unknown panic");
    }
}
