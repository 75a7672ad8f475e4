//! The plugin registry and its lifecycle manager.
//!
//! [`PluginManager`] owns every registered data source behind one
//! `RwLock`, tracks which plugin is active, and orchestrates the
//! activation flow. At most one plugin is active, and at most one
//! external session is live, at a time: switching the active plugin
//! closes the outgoing one before the switch completes. The first
//! successful registration becomes active automatically, matching what a
//! single-document charting window expects.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{info, warn};

use ridgeline_protocol::FilePattern;

use crate::descriptor::HOST_API_VERSION;
use crate::error::HostError;
use crate::form::DialogHost;
use crate::source::DataSource;

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "ridgeline_host::registry";

struct PluginEntry {
    source: Arc<dyn DataSource>,
    enabled: bool,
}

#[derive(Default)]
struct ManagerState {
    plugins: HashMap<String, PluginEntry>,
    active: Option<String>,
}

/// The source currently holding the active slot, if any.
fn current_source(state: &ManagerState) -> Option<Arc<dyn DataSource>> {
    state
        .active
        .as_deref()
        .and_then(|name| state.plugins.get(name))
        .map(|entry| Arc::clone(&entry.source))
}

/// Closes an outgoing source. A failure here must not abort the switch,
/// so it is logged and swallowed.
fn close_outgoing(source: &Arc<dyn DataSource>) {
    if let Err(err) = source.close() {
        warn!(
            target: REGISTRY_TARGET,
            plugin = source.name(),
            error = %err,
            "outgoing plugin failed to close"
        );
    }
}

/// A snapshot of one registered plugin, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginHandle {
    /// Plugin name.
    pub name: String,
    /// Protocol API version the plugin implements.
    pub version: u32,
    /// Whether the plugin may be activated.
    pub enabled: bool,
    /// Whether the plugin is the active one.
    pub active: bool,
}

/// Name and file patterns of one enabled plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Plugin name.
    pub name: String,
    /// File types the plugin claims to open.
    pub patterns: Vec<FilePattern>,
}

/// One file pattern together with the plugin that claims it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFilePattern {
    /// Name of the claiming plugin.
    pub plugin: String,
    /// The claimed file pattern.
    pub pattern: FilePattern,
}

/// Registry of data sources with a single active plugin.
#[derive(Default)]
pub struct PluginManager {
    state: RwLock<ManagerState>,
}

impl PluginManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a data source under the name it reports.
    ///
    /// Registration is a catalogue operation: nothing is spawned or
    /// contacted, the source's own identity accessors supply the name,
    /// version, and patterns. The first registered plugin becomes
    /// active.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::VersionMismatch`] when the source implements
    /// an unsupported API version and [`HostError::DuplicateName`] when
    /// the name is taken.
    pub fn register(&self, source: Arc<dyn DataSource>) -> Result<String, HostError> {
        if source.version() != HOST_API_VERSION {
            return Err(HostError::VersionMismatch {
                name: source.name().to_owned(),
                version: source.version(),
                supported: HOST_API_VERSION,
            });
        }

        let name = source.name().to_owned();
        let mut state = self.write_state();
        if state.plugins.contains_key(&name) {
            return Err(HostError::DuplicateName { name });
        }

        let first = state.plugins.is_empty();
        state.plugins.insert(
            name.clone(),
            PluginEntry {
                source,
                enabled: true,
            },
        );
        if first {
            state.active = Some(name.clone());
        }

        info!(
            target: REGISTRY_TARGET,
            plugin = %name,
            active = first,
            "registered plugin"
        );
        Ok(name)
    }

    /// Looks up an enabled plugin by name.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] for an unknown name and
    /// [`HostError::Disabled`] for a disabled plugin.
    pub fn get(&self, name: &str) -> Result<Arc<dyn DataSource>, HostError> {
        let state = self.read_state();
        let entry = state.plugins.get(name).ok_or_else(|| HostError::NotFound {
            name: name.to_owned(),
        })?;
        if !entry.enabled {
            return Err(HostError::Disabled {
                name: name.to_owned(),
            });
        }
        Ok(Arc::clone(&entry.source))
    }

    /// The active plugin's data source.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NoActivePlugin`] when nothing is active.
    pub fn active(&self) -> Result<Arc<dyn DataSource>, HostError> {
        current_source(&self.read_state()).ok_or(HostError::NoActivePlugin)
    }

    /// The active plugin's name, when one is active.
    #[must_use]
    pub fn active_name(&self) -> Option<String> {
        self.read_state().active.clone()
    }

    /// Makes the named plugin active, closing the previously active one
    /// first. The call returns only once the outgoing session has shut
    /// down, so at most one external session is ever live. Selecting the
    /// already active plugin changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] for an unknown name and
    /// [`HostError::Disabled`] for a disabled plugin; either way the
    /// previously active plugin keeps its slot, untouched.
    pub fn set_active(&self, name: &str) -> Result<(), HostError> {
        let mut state = self.write_state();
        let entry = state.plugins.get(name).ok_or_else(|| HostError::NotFound {
            name: name.to_owned(),
        })?;
        if !entry.enabled {
            return Err(HostError::Disabled {
                name: name.to_owned(),
            });
        }
        if state.active.as_deref() != Some(name) {
            if let Some(previous) = current_source(&state) {
                close_outgoing(&previous);
            }
            state.active = Some(name.to_owned());
        }
        Ok(())
    }

    /// Enables or disables the named plugin. Disabling the active plugin
    /// clears the active slot.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] for an unknown name.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), HostError> {
        let mut state = self.write_state();
        let entry = state
            .plugins
            .get_mut(name)
            .ok_or_else(|| HostError::NotFound {
                name: name.to_owned(),
            })?;
        entry.enabled = enabled;
        if !enabled && state.active.as_deref() == Some(name) {
            state.active = None;
        }
        info!(
            target: REGISTRY_TARGET,
            plugin = name,
            enabled,
            "plugin availability changed"
        );
        Ok(())
    }

    /// Switches to the named plugin and initialises it.
    ///
    /// The outgoing session is always shut down first, even when the
    /// same plugin is re-activated: initialisation starts from a fresh
    /// process. The switch itself then happens before initialisation, so
    /// a failed or cancelled initialisation leaves the new plugin
    /// active but unstarted; the caller distinguishes user cancellation
    /// with [`HostError::is_cancelled`].
    ///
    /// # Errors
    ///
    /// Fails when the plugin is unknown or disabled, or when its
    /// initialisation fails.
    pub fn activate(
        &self,
        name: &str,
        args: Option<&str>,
        dialog: &mut dyn DialogHost,
    ) -> Result<Value, HostError> {
        let source = self.get(name)?;
        {
            let mut state = self.write_state();
            if let Some(current) = current_source(&state) {
                close_outgoing(&current);
            }
            state.active = Some(name.to_owned());
        }
        info!(target: REGISTRY_TARGET, plugin = name, "activating plugin");
        source.initialize(args, dialog)
    }

    /// Snapshots every registered plugin, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<PluginHandle> {
        let state = self.read_state();
        let mut handles: Vec<PluginHandle> = state
            .plugins
            .iter()
            .map(|(name, entry)| PluginHandle {
                name: name.clone(),
                version: entry.source.version(),
                enabled: entry.enabled,
                active: state.active.as_deref() == Some(name.as_str()),
            })
            .collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    /// Names and file patterns of every enabled plugin, sorted by name.
    ///
    /// Disabled plugins are left out, so aggregate consumers such as a
    /// file-open dialog never offer them.
    #[must_use]
    pub fn list_metadata(&self) -> Vec<PluginMetadata> {
        let state = self.read_state();
        let mut metadata: Vec<PluginMetadata> = state
            .plugins
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, entry)| PluginMetadata {
                name: name.clone(),
                patterns: entry.source.patterns().to_vec(),
            })
            .collect();
        metadata.sort_by(|a, b| a.name.cmp(&b.name));
        metadata
    }

    /// Every file pattern claimed by an enabled plugin, tagged with the
    /// claiming plugin's name and ordered by it.
    #[must_use]
    pub fn all_file_patterns(&self) -> Vec<PluginFilePattern> {
        let mut patterns = Vec::new();
        for metadata in self.list_metadata() {
            for pattern in metadata.patterns {
                patterns.push(PluginFilePattern {
                    plugin: metadata.name.clone(),
                    pattern,
                });
            }
        }
        patterns
    }

    /// Closes every plugin and empties the registry.
    ///
    /// Every plugin is closed even when an earlier one fails; the first
    /// failure is returned after the sweep completes.
    ///
    /// # Errors
    ///
    /// Returns the first close failure encountered.
    pub fn close_all(&self) -> Result<(), HostError> {
        let entries: Vec<(String, Arc<dyn DataSource>)> = {
            let mut state = self.write_state();
            state.active = None;
            state
                .plugins
                .drain()
                .map(|(name, entry)| (name, entry.source))
                .collect()
        };

        let mut first_error = None;
        for (name, source) in entries {
            if let Err(err) = source.close() {
                warn!(
                    target: REGISTRY_TARGET,
                    plugin = %name,
                    error = %err,
                    "plugin failed to close"
                );
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_state().plugins.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_state().plugins.is_empty()
    }

    // A poisoned lock only means another caller panicked; the map itself
    // stays consistent, so the poison is shrugged off.
    fn read_state(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("PluginManager")
            .field("plugins", &state.plugins.len())
            .field("active", &state.active)
            .finish()
    }
}
