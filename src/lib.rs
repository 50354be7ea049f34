//! # patent-hub
//!
//! Host for the [`patent_coord`] engine: TOML configuration, directory
//! layout, logging, backend wiring and the `patent-hub` command line.

pub mod config;
pub mod error;
pub mod hub_dirs;
pub mod logging;
pub mod search;
pub mod wiring;

pub use config::{BackendConfig, BackendKind, ExportConfig, HubConfig, LoggingConfig};
pub use error::{HubError, Result};
pub use search::{SearchInput, build_query, export_destination, summarize};
pub use wiring::{build_coordinator, build_registry};
