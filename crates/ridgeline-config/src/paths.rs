//! Well-known filesystem locations for the host.

use std::path::PathBuf;

use crate::ConfigError;

/// Directory name used under the platform configuration and data roots.
const APP_DIR: &str = "ridgeline";

/// Path of the persistent settings document.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when the platform exposes no user
/// configuration directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join("config.json"))
        .ok_or(ConfigError::NoConfigDir)
}

/// The per-user plugin directory, when the platform exposes a data root.
#[must_use]
pub fn default_plugin_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR).join("plugins"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_the_app_document() {
        if let Ok(path) = default_config_path() {
            assert!(path.ends_with("ridgeline/config.json"));
        }
    }

    #[test]
    fn plugin_dir_lives_under_the_app_data_root() {
        if let Some(dir) = default_plugin_dir() {
            assert!(dir.ends_with("ridgeline/plugins"));
        }
    }
}
