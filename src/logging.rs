//! Tracing subscriber setup for the host.
//!
//! Events go to stderr, filtered by `RUST_LOG` or the configured directives.
//! With `[logging] file = true` they are also written, without ANSI colours,
//! to a daily-rolling file under [`crate::hub_dirs::logs_dir`].

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::{HubError, Result};

/// Filter used when neither `RUST_LOG` nor `[logging] filter` is set.
pub const DEFAULT_FILTER: &str = "patent_hub=info,patent_coord=info";

const LOG_FILE_PREFIX: &str = "patent-hub.log";

/// Keeps the file writer flushing. Drop it only at shutdown.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// The filter for `config`, preferring `RUST_LOG` when it parses.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.as_deref().unwrap_or(DEFAULT_FILTER)))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`HubError::Io`] if the logs directory cannot be created and
/// [`HubError::Logging`] if a global subscriber is already installed.
pub fn init(config: &LoggingConfig, logs_dir: &Path) -> Result<LogGuard> {
    let stderr = fmt::layer().with_writer(std::io::stderr);

    if !config.file {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(stderr)
            .try_init()
            .map_err(|e| HubError::Logging(e.to_string()))?;
        return Ok(LogGuard { _file: None });
    }

    std::fs::create_dir_all(logs_dir)?;
    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|e| HubError::Logging(e.to_string()))?;

    tracing::debug!(dir = %logs_dir.display(), "file logging enabled");
    Ok(LogGuard { _file: Some(guard) })
}
