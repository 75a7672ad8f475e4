//! Errors surfaced by the command line tool.

use thiserror::Error;

use ridgeline_config::ConfigError;
use ridgeline_host::HostError;

use crate::telemetry::TelemetryError;

/// Anything that can stop a command from completing.
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings could not be loaded or persisted.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A plugin operation failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Telemetry could not be initialised.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Command output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command output could not be rendered as JSON.
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}
