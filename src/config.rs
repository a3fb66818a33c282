//! Configuration module for the inbox splitter.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! Directory locations are not part of the settings file; they come from the
//! command line and are resolved by [`crate::paths::WatchConfig`].
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCSPLIT_` and use double
//! underscores to separate nested levels:
//! - `DOCSPLIT_WATCH__POLL_INTERVAL_MS=250` sets `watch.poll_interval_ms`
//! - `DOCSPLIT_RELOCATION__OVERWRITE=true` sets `relocation.overwrite`
//! - `DOCSPLIT_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-project settings directory.
pub const SETTINGS_DIR: &str = ".docsplit";

/// Settings file name inside [`SETTINGS_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Inbox monitoring and polling behaviour
    #[serde(default)]
    pub watch: WatchSettings,

    /// Copy/archive/delete behaviour after a successful export
    #[serde(default)]
    pub relocation: RelocationSettings,

    /// Log filtering
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchSettings {
    /// Extension (without the dot) of the documents picked up from the inbox
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Interval between readiness and engine-open polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for a locked file after this many seconds.
    /// Absent means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_timeout_secs: Option<u64>,

    /// Give up waiting for the engine to finish opening a document.
    /// Absent means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_timeout_secs: Option<u64>,

    /// Capacity of the channel between the listener thread and the dispatcher
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelocationSettings {
    /// Replace files of the same name already present in copy/archive
    #[serde(default)]
    pub overwrite: bool,

    /// Create copy/archive directories when they do not exist yet
    #[serde(default = "default_true")]
    pub create_missing_dirs: bool,
}

/// Logging configuration with per-module overrides.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `docsplit::engine = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_extension() -> String {
    "pdf".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_event_buffer() -> usize {
    100
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchSettings::default(),
            relocation: RelocationSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            poll_interval_ms: default_poll_interval_ms(),
            readiness_timeout_secs: None,
            open_timeout_secs: None,
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for RelocationSettings {
    fn default() -> Self {
        Self {
            overwrite: false,
            create_missing_dirs: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatchSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.readiness_timeout_secs.map(Duration::from_secs)
    }

    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout_secs.map(Duration::from_secs)
    }

    /// Extension without a leading dot, as used for output artifacts.
    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// Uses the nearest `.docsplit/settings.toml` above the working directory
    /// when present; a missing file simply contributes nothing.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(SETTINGS_DIR).join(SETTINGS_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration with a specific settings file as the TOML layer.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting levels, single underscores
            // stay part of the field name
            .merge(Env::prefixed("DOCSPLIT_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a `.docsplit` directory
    /// from the current directory up to the root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(SETTINGS_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Render the effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
