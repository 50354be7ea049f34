//! Host configuration loaded from TOML.
//!
//! Every section and field has a serde default, so an empty file (or no file
//! at all) yields a usable configuration with no backends registered.
//!
//! ```toml
//! [coordinator]
//! backend_timeout_seconds = 120
//! merge_order = "request"
//!
//! [search]
//! max_results_per_db = 50
//!
//! [[backends]]
//! id = "uspto"
//! kind = "http"
//! base_url = "http://127.0.0.1:8700/uspto"
//! api_key_env = "USPTO_BOT_KEY"
//!
//! [[backends]]
//! id = "twpat"
//! kind = "fixture"
//! path = "fixtures/twpat.json"
//!
//! [export]
//! enabled = true
//! format = "csv"
//! ```

use patent_coord::{CoordinatorConfig, DatabaseId, ExportFormat, SearchOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{HubError, Result};

/// Top-level host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub coordinator: CoordinatorConfig,
    /// Defaults for every search; CLI flags override individual fields.
    pub search: SearchOptions,
    pub logging: LoggingConfig,
    pub export: ExportConfig,
    pub backends: Vec<BackendConfig>,
}

/// How a configured backend is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Canned results read from a JSON file.
    #[default]
    Fixture,
    /// A remote search service.
    Http,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixture => "fixture",
            Self::Http => "http",
        }
    }
}

/// One `[[backends]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Database id this backend serves.
    pub id: String,
    /// Display name; defaults to the id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: BackendKind,
    /// Fixture file. Relative paths resolve against the config file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// HTTP client timeout for this backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl BackendConfig {
    pub fn database_id(&self) -> DatabaseId {
        DatabaseId::new(&self.id)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Where this backend gets its results from, for listings.
    pub fn target(&self) -> String {
        match self.kind {
            BackendKind::Fixture => self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            BackendKind::Http => self.base_url.clone().unwrap_or_default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(HubError::Config("backend id must not be empty".into()));
        }
        match self.kind {
            BackendKind::Fixture if self.path.is_none() => Err(HubError::Config(format!(
                "backend {}: fixture backends need a path",
                self.id
            ))),
            BackendKind::Http if self.base_url.is_none() => Err(HubError::Config(format!(
                "backend {}: http backends need a base_url",
                self.id
            ))),
            _ if self.timeout_seconds == Some(0) => Err(HubError::Config(format!(
                "backend {}: timeout_seconds must be greater than 0",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write a daily-rolling log file under the logs directory.
    pub file: bool,
    /// Filter directives used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// `[export]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Export every search even without `--output`.
    pub enabled: bool,
    pub format: ExportFormat,
    /// Export directory; defaults to the data directory's `exports/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl HubConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| HubError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| HubError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path, `config.toml` in
    /// [`crate::hub_dirs::config_dir`].
    pub fn default_config_path() -> PathBuf {
        crate::hub_dirs::config_file()
    }

    /// Checks engine settings and backend entries.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] for invalid engine settings, incomplete
    /// backend entries, or two entries claiming the same database id.
    pub fn validate(&self) -> Result<()> {
        self.coordinator.validate()?;
        self.search.validate()?;

        let mut seen = HashSet::new();
        for backend in &self.backends {
            backend.validate()?;
            if !seen.insert(backend.database_id()) {
                return Err(HubError::Config(format!(
                    "duplicate backend id: {}",
                    backend.id
                )));
            }
        }
        Ok(())
    }

    pub fn backend(&self, id: &DatabaseId) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| &b.database_id() == id)
    }
}
