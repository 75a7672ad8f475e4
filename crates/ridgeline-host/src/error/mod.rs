//! Domain errors raised by the plugin runtime.
//!
//! All errors use `thiserror`-derived enums with structured context so
//! callers can inspect the failure programmatically. I/O errors are wrapped
//! in `Arc` to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use ridgeline_protocol::{CANCELLED, ProtocolError};

/// Errors arising from plugin runtime operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// The requested plugin was not found in the registry.
    #[error("plugin '{name}' not found in registry")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A plugin with the same name is already registered.
    #[error("plugin '{name}' is already registered")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// The plugin implements a protocol version the host does not speak.
    #[error("plugin '{name}' implements API version {version}, host supports {supported}")]
    VersionMismatch {
        /// Plugin name.
        name: String,
        /// Version the plugin reported.
        version: u32,
        /// Version this host supports.
        supported: u32,
    },

    /// The plugin is registered but disabled.
    #[error("plugin '{name}' is disabled")]
    Disabled {
        /// Plugin name.
        name: String,
    },

    /// No plugin is currently active.
    #[error("no active plugin")]
    NoActivePlugin,

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// An I/O error occurred while communicating with the plugin process.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin wrote a line the codec could not decode.
    #[error("plugin '{name}' wrote an invalid message: {source}")]
    Protocol {
        /// Plugin name.
        name: String,
        /// Underlying codec error.
        #[source]
        source: ProtocolError,
    },

    /// The plugin answered with a message shape the outstanding request
    /// cannot accept; the stream position is no longer trustworthy.
    #[error("plugin '{name}' desynchronised the stream: {message}")]
    Desynchronised {
        /// Plugin name.
        name: String,
        /// Description of the violation.
        message: String,
    },

    /// The session has ended; the plugin exited or was closed.
    #[error("session with plugin '{name}' is closed")]
    SessionClosed {
        /// Plugin name.
        name: String,
    },

    /// The plugin reported a call failure on the wire.
    #[error("plugin '{name}' failed: {message}")]
    PluginFailure {
        /// Plugin name.
        name: String,
        /// The plugin's error string.
        message: String,
    },

    /// A candidate executable did not answer the metadata probe.
    #[error("metadata probe of '{path}' failed: {message}")]
    ProbeFailed {
        /// Path that was probed.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

impl HostError {
    /// Returns `true` when the failure is the user cancelling a form,
    /// which callers surface as a dismissal rather than an error.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::PluginFailure { message, .. } if message == CANCELLED)
    }

    /// Wraps an I/O failure on the named plugin's streams.
    #[must_use]
    pub fn io(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source: Arc::new(source),
        }
    }
}
