//! Maps database ids to backend instances.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::BackendCapability;
use crate::types::DatabaseId;

/// Registered backends, keyed by database id.
///
/// Looking up an unregistered id is not an error here; the execution layer
/// records it as an unsupported database and carries on.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<DatabaseId, Arc<dyn BackendCapability>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under `id`, returning any backend it replaced.
    pub fn register<B>(&mut self, id: impl Into<DatabaseId>, backend: B) -> Option<Arc<dyn BackendCapability>>
    where
        B: BackendCapability + 'static,
    {
        self.register_shared(id, Arc::new(backend))
    }

    /// Register an already shared backend under `id`.
    pub fn register_shared(
        &mut self,
        id: impl Into<DatabaseId>,
        backend: Arc<dyn BackendCapability>,
    ) -> Option<Arc<dyn BackendCapability>> {
        let id = id.into();
        tracing::debug!(database = %id, backend = backend.name(), "registered backend");
        self.backends.insert(id, backend)
    }

    pub fn lookup(&self, id: &DatabaseId) -> Option<Arc<dyn BackendCapability>> {
        self.backends.get(id).cloned()
    }

    pub fn contains(&self, id: &DatabaseId) -> bool {
        self.backends.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<DatabaseId> {
        let mut ids: Vec<DatabaseId> = self.backends.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
