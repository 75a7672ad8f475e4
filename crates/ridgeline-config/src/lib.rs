//! Persistent configuration for the Ridgeline plugin host.
//!
//! Settings are a single JSON document under the user's configuration
//! directory: which directories to scan for plugins, which plugins the
//! user has disabled, the metadata probe budget, and how the host logs.
//! A missing document yields defaults so a fresh installation needs no
//! setup.

mod logging;
mod paths;
mod settings;

pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::paths::{default_config_path, default_plugin_dir};
pub use self::settings::{ConfigError, HostConfig};
