//! Structured telemetry initialisation for the command line tool.
//!
//! Logs go to stderr so stdout stays reserved for command output; the
//! settings document picks the filter expression and the output format.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use ridgeline_config::{HostConfig, LogFormat};

static TELEMETRY_GUARD: OnceCell<LogFormat> = OnceCell::new();

/// Proof that telemetry is installed, carrying the format in effect.
///
/// The first [`initialise`] call decides the format for the whole
/// process; later calls report that original format regardless of the
/// configuration they were handed.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// The log format the process-wide subscriber was installed with.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Idempotent: only the first call touches global state.
///
/// # Examples
///
/// ```rust
/// use ridgeline_cli::telemetry;
/// use ridgeline_config::HostConfig;
///
/// # fn main() -> Result<(), telemetry::TelemetryError> {
/// let config = HostConfig::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// assert_eq!(first.format(), second.format());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparseable filter
/// expression and [`TelemetryError::Subscriber`] when installation
/// fails.
pub fn initialise(config: &HostConfig) -> Result<TelemetryHandle, TelemetryError> {
    let format = TELEMETRY_GUARD.get_or_try_init(|| {
        tracing::subscriber::set_global_default(build_subscriber(config)?)
            .map_err(TelemetryError::Subscriber)?;
        Ok(config.log_format())
    })?;
    Ok(TelemetryHandle { format: *format })
}

fn build_subscriber(
    config: &HostConfig,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}
