//! Single-consumer collector for execution log entries and backend results.
//!
//! During the execution phase exactly one task owns the [`ExecutionLog`] and
//! the per-database result map. Workers never touch either directly: they
//! send [`RunEvent`]s through a [`RunSink`], and the collector applies them
//! in receive order.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::types::{BackendResult, DatabaseId};

/// Ordered, append-only, human-readable trace of one coordination run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionLog {
    entries: Vec<String>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Messages workers send to the collector.
#[derive(Debug)]
pub(crate) enum RunEvent {
    Log(String),
    Finished(BackendResult),
}

/// Cloneable write handle onto the collector.
#[derive(Debug, Clone)]
pub(crate) struct RunSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl RunSink {
    pub(crate) fn info(&self, entry: String) {
        tracing::info!("{entry}");
        self.send(RunEvent::Log(entry));
    }

    pub(crate) fn warn(&self, entry: String) {
        tracing::warn!("{entry}");
        self.send(RunEvent::Log(entry));
    }

    pub(crate) fn finish(&self, result: BackendResult) {
        self.send(RunEvent::Finished(result));
    }

    fn send(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            tracing::error!("run collector stopped; event dropped");
        }
    }
}

/// Everything the collector accumulated once every sink was dropped.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub log: ExecutionLog,
    pub results: BTreeMap<DatabaseId, BackendResult>,
    /// Database ids in the order their results arrived.
    pub arrival_order: Vec<DatabaseId>,
}

/// Start the collector task, seeded with `log`.
///
/// The task finishes once every [`RunSink`] clone has been dropped.
pub(crate) fn spawn_collector(log: ExecutionLog) -> (RunSink, JoinHandle<Collected>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let mut collected = Collected {
            log,
            ..Default::default()
        };
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Log(entry) => collected.log.push(entry),
                RunEvent::Finished(result) => {
                    let id = result.database_id.clone();
                    if collected.results.insert(id.clone(), result).is_none() {
                        collected.arrival_order.push(id);
                    }
                }
            }
        }
        collected
    });
    (RunSink { tx }, handle)
}
