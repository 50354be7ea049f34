//! Centralized directory paths for patent-hub.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/patent-hub/` | `~/.local/share/patent-hub/` |
//! | Config | `~/Library/Application Support/patent-hub/` | `~/.config/patent-hub/` |
//!
//! # Environment Overrides
//!
//! - `PATENT_HUB_DATA_DIR` overrides [`data_dir`]
//! - `PATENT_HUB_CONFIG_DIR` overrides [`config_dir`]

use std::ffi::OsString;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "PATENT_HUB_DATA_DIR";
pub const CONFIG_DIR_ENV: &str = "PATENT_HUB_CONFIG_DIR";

/// Application data root directory.
///
/// Holds logs and exported result snapshots. Resolves to
/// `dirs::data_dir()/patent-hub/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os(DATA_DIR_ENV),
        dirs::data_dir(),
        "/tmp/patent-hub-data",
    )
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/patent-hub/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os(CONFIG_DIR_ENV),
        dirs::config_dir(),
        "/tmp/patent-hub-config",
    )
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Default export directory (`data_dir()/exports/`).
#[must_use]
pub fn exports_dir() -> PathBuf {
    data_dir().join("exports")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

fn resolve(override_dir: Option<OsString>, platform: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    platform
        .map(|d| d.join("patent-hub"))
        .unwrap_or_else(|| PathBuf::from(fallback))
}
