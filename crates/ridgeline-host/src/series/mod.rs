//! Series data fetches against the registry.
//!
//! [`SeriesBridge`] is the narrow surface a rendering layer calls to get
//! numeric data. The raw fetch hands back whatever frame the plugin
//! produced; the plugin's layout hint is advisory, so a caller that needs
//! a specific layout uses [`SeriesBridge::fetch_as`], which converts the
//! frame when the plugin chose differently.

use std::sync::Arc;

use tracing::debug;

use ridgeline_protocol::{BinaryFrame, StorageLayout};

use crate::error::HostError;
use crate::registry::PluginManager;

/// Tracing target for series fetches.
const SERIES_TARGET: &str = "ridgeline_host::series";

/// Fetches series frames from registered plugins.
#[derive(Debug, Clone)]
pub struct SeriesBridge {
    manager: Arc<PluginManager>,
}

impl SeriesBridge {
    /// Creates a bridge over the given registry.
    #[must_use]
    pub const fn new(manager: Arc<PluginManager>) -> Self {
        Self { manager }
    }

    /// Fetches one series, from the named plugin or the active one.
    ///
    /// The returned frame's storage field reports the layout the plugin
    /// actually used, which may differ from `preferred`.
    ///
    /// # Errors
    ///
    /// Fails when no plugin is selected, the plugin is unknown or
    /// disabled, or the fetch itself fails.
    pub fn fetch(
        &self,
        plugin: Option<&str>,
        series_id: &str,
        preferred: Option<StorageLayout>,
    ) -> Result<BinaryFrame, HostError> {
        let source = match plugin {
            Some(name) => self.manager.get(name)?,
            None => self.manager.active()?,
        };
        let frame = source.series_data(series_id, preferred)?;
        debug!(
            target: SERIES_TARGET,
            plugin = source.name(),
            series_id,
            points = frame.point_count(),
            storage = %frame.storage(),
            "fetched series frame"
        );
        Ok(frame)
    }

    /// Fetches one series and guarantees the requested layout, converting
    /// the frame when the plugin ignored the hint.
    ///
    /// # Errors
    ///
    /// Fails for the same reasons as [`SeriesBridge::fetch`].
    pub fn fetch_as(
        &self,
        plugin: Option<&str>,
        series_id: &str,
        layout: StorageLayout,
    ) -> Result<BinaryFrame, HostError> {
        Ok(self
            .fetch(plugin, series_id, Some(layout))?
            .into_layout(layout))
    }
}

#[cfg(test)]
mod tests;
