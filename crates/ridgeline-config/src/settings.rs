//! Persistent host settings.
//!
//! Settings live in one JSON document under the user's configuration
//! directory. A missing file is not an error; it simply yields the
//! defaults, so a fresh installation works without any setup step.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LogFormat;

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOG_FILTER: &str = "info";

/// Persistent settings for the plugin host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    plugin_dirs: Vec<PathBuf>,
    disabled_plugins: Vec<String>,
    probe_timeout_ms: u64,
    log_filter: String,
    log_format: LogFormat,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            disabled_plugins: Vec::new(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}

impl HostConfig {
    /// Reads settings from `path`, yielding defaults when the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] for any I/O failure other than a
    /// missing file and [`ConfigError::Parse`] for invalid JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes settings to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let text = serde_json::to_string_pretty(self).map_err(ConfigError::Serialise)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directories scanned for plugin executables.
    #[must_use]
    pub fn plugin_dirs(&self) -> &[PathBuf] {
        &self.plugin_dirs
    }

    /// Adds a plugin directory if it is not already listed.
    pub fn add_plugin_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.plugin_dirs.contains(&dir) {
            self.plugin_dirs.push(dir);
        }
    }

    /// Returns `true` when the named plugin has been disabled.
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_plugins.iter().any(|entry| entry == name)
    }

    /// Records the named plugin as enabled or disabled.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if enabled {
            self.disabled_plugins.retain(|entry| entry != name);
        } else if !self.is_disabled(name) {
            self.disabled_plugins.push(name.to_owned());
        }
    }

    /// Budget for a candidate executable to answer the metadata probe.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Tracing filter expression, e.g. `info` or `ridgeline_host=debug`.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Overrides the tracing filter expression.
    pub fn set_log_filter(&mut self, filter: impl Into<String>) {
        self.log_filter = filter.into();
    }

    /// Logging output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Overrides the logging output format.
    pub const fn set_log_format(&mut self, format: LogFormat) {
        self.log_format = format;
    }
}

/// Errors raised while loading or persisting host settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings from '{path}': {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The settings file holds invalid JSON.
    #[error("invalid settings in '{path}': {source}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The settings file could not be written.
    #[error("failed to write settings to '{path}': {source}")]
    Write {
        /// Path that was written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Settings could not be serialised to JSON.
    #[error("failed to serialise settings: {0}")]
    Serialise(#[source] serde_json::Error),

    /// No user configuration directory could be determined.
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
}
