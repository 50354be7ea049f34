//! Builds the backend registry and coordinator from a [`HubConfig`].

use std::path::Path;

use patent_coord::backends::{FixtureBackend, HttpBackend, HttpBackendConfig};
use patent_coord::{BackendRegistry, Coordinator};

use crate::config::{BackendConfig, BackendKind, HubConfig};
use crate::error::Result;

/// Register one backend per `[[backends]]` entry.
///
/// Relative fixture paths are resolved against `base_dir`. API keys are read
/// through `lookup_env`; an unset variable registers the backend without a
/// key and logs a warning.
///
/// # Errors
///
/// Returns an error if a fixture cannot be loaded or an HTTP backend cannot
/// be built.
pub fn build_registry_with<F>(config: &HubConfig, base_dir: &Path, lookup_env: F) -> Result<BackendRegistry>
where
    F: Fn(&str) -> Option<String>,
{
    let mut registry = BackendRegistry::new();
    for backend in &config.backends {
        match backend.kind {
            BackendKind::Fixture => {
                registry.register(backend.database_id(), fixture_backend(backend, base_dir)?);
            }
            BackendKind::Http => {
                registry.register(backend.database_id(), http_backend(backend, &lookup_env)?);
            }
        }
    }
    tracing::info!(count = registry.len(), "backend registry ready");
    Ok(registry)
}

/// [`build_registry_with`] reading API keys from the process environment.
///
/// # Errors
///
/// Same as [`build_registry_with`].
pub fn build_registry(config: &HubConfig, base_dir: &Path) -> Result<BackendRegistry> {
    build_registry_with(config, base_dir, |name| std::env::var(name).ok())
}

/// Build a [`Coordinator`] over the configured backends.
///
/// # Errors
///
/// Returns an error if the registry cannot be built or the coordinator
/// settings are invalid.
pub fn build_coordinator(config: &HubConfig, base_dir: &Path) -> Result<Coordinator> {
    let registry = build_registry(config, base_dir)?;
    Ok(Coordinator::new(registry, config.coordinator.clone())?)
}

fn fixture_backend(backend: &BackendConfig, base_dir: &Path) -> Result<FixtureBackend> {
    let path = backend.path.as_deref().unwrap_or_else(|| Path::new(""));
    let resolved = if path.is_relative() {
        base_dir.join(path)
    } else {
        path.to_path_buf()
    };
    Ok(FixtureBackend::from_file(backend.display_name(), &resolved)?)
}

fn http_backend<F>(backend: &BackendConfig, lookup_env: &F) -> Result<HttpBackend>
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = backend.base_url.clone().unwrap_or_default();
    let api_key = backend.api_key_env.as_deref().and_then(|var| {
        let key = lookup_env(var).filter(|k| !k.is_empty());
        if key.is_none() {
            tracing::warn!(database = %backend.id, env = var, "API key variable is not set");
        }
        key
    });

    let mut http = HttpBackendConfig::new(base_url);
    http.api_key = api_key;
    if let Some(seconds) = backend.timeout_seconds {
        http.timeout_seconds = seconds;
    }
    Ok(HttpBackend::new(backend.display_name(), &http)?)
}
