//! Error types for the patent-coord crate.
//!
//! All errors use stable string messages suitable for the execution log and
//! for the `error` field of a failed backend result. No API keys or request
//! bodies appear in error messages.

use crate::types::DatabaseId;

/// Errors that can occur while coordinating a multi-database search.
#[derive(Debug, thiserror::Error)]
pub enum CoordError {
    /// The requested database id has no registered backend.
    #[error("unsupported database")]
    UnsupportedDatabase(DatabaseId),

    /// A backend call failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// A backend unit panicked; the payload is the panic message.
    #[error("backend panicked: {0}")]
    Panicked(String),

    /// A backend call exceeded its deadline.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The run (or a single backend call) was cancelled. The payload names
    /// what was cancelled.
    #[error("{0} cancelled")]
    Cancelled(String),

    /// Folding backend results into the merged set failed.
    #[error("merge error: {0}")]
    Merge(String),

    /// Writing a snapshot to an export sink failed.
    #[error("export error: {0}")]
    Export(String),

    /// Invalid configuration or search options.
    #[error("config error: {0}")]
    Config(String),

    /// An HTTP request to a remote backend failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Coordination machinery failed outside any single backend.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for patent-coord results.
pub type Result<T> = std::result::Result<T, CoordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unsupported_database_is_stable() {
        let err = CoordError::UnsupportedDatabase(DatabaseId::new("epo"));
        assert_eq!(err.to_string(), "unsupported database");
    }

    #[test]
    fn display_timeout() {
        let err = CoordError::Timeout(30);
        assert_eq!(err.to_string(), "timed out after 30s");
    }

    #[test]
    fn display_backend() {
        let err = CoordError::Backend("login page changed".into());
        assert_eq!(err.to_string(), "backend error: login page changed");
    }

    #[test]
    fn display_panicked() {
        let err = CoordError::Panicked("selector not found".into());
        assert_eq!(err.to_string(), "backend panicked: selector not found");
    }

    #[test]
    fn display_config() {
        let err = CoordError::Config("backend_timeout_seconds must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "config error: backend_timeout_seconds must be greater than 0"
        );
    }

    #[test]
    fn display_cancelled() {
        let err = CoordError::Cancelled("coordination".into());
        assert_eq!(err.to_string(), "coordination cancelled");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoordError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoordError>();
    }
}
