//! Error types for the patent-hub host.

use patent_coord::CoordError;

/// Top-level error type for the host application.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Logging could not be initialised.
    #[error("logging error: {0}")]
    Logging(String),

    /// A coordination run finished with status `failed`.
    #[error("search failed: {0}")]
    SearchFailed(String),

    /// Error raised by the coordination engine.
    #[error(transparent)]
    Coord(#[from] CoordError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HubError>;
