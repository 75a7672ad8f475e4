//! CLI argument definitions for the Ridgeline plugin host.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use ridgeline_config::LogFormat;
use ridgeline_protocol::StorageLayout;

/// Command-line interface for the Ridgeline plugin host.
#[derive(Parser, Debug)]
#[command(name = "ridgeline", version, about = "Ridgeline plugin host tooling")]
pub(crate) struct Cli {
    /// Path to the settings document.
    #[arg(long, value_name = "PATH", global = true)]
    pub(crate) config: Option<PathBuf>,
    /// Tracing filter override, e.g. `ridgeline_host=debug`.
    #[arg(long, value_name = "FILTER", global = true)]
    pub(crate) log_filter: Option<String>,
    /// Logging output format override.
    #[arg(long, value_enum, value_name = "FORMAT", global = true)]
    pub(crate) log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Plugin discovery operations.
    Plugins {
        /// The discovery action to perform.
        #[command(subcommand)]
        action: PluginsAction,
    },
    /// Prints a plugin's chart configuration as JSON.
    Chart {
        /// Plugin executable to run.
        path: PathBuf,
        /// Opaque initialisation string passed to the plugin.
        #[arg(long)]
        args: Option<String>,
    },
    /// Series operations against one plugin.
    Series {
        /// The series action to perform.
        #[command(subcommand)]
        action: SeriesAction,
    },
}

/// Discovery actions.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum PluginsAction {
    /// Scans the configured directories and lists every plugin that
    /// answers the metadata probe.
    List {
        /// Extra directories to scan, in addition to the configured ones.
        #[arg(long = "dir", value_name = "DIR")]
        dirs: Vec<PathBuf>,
    },
    /// Probes one executable and prints its metadata as JSON.
    Probe {
        /// Candidate executable to probe.
        path: PathBuf,
    },
}

/// Series actions.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum SeriesAction {
    /// Lists the series a plugin offers.
    List {
        /// Plugin executable to run.
        path: PathBuf,
        /// Opaque initialisation string passed to the plugin.
        #[arg(long)]
        args: Option<String>,
    },
    /// Fetches one series.
    Fetch {
        /// Plugin executable to run.
        path: PathBuf,
        /// Identifier of the series to fetch.
        series_id: String,
        /// Opaque initialisation string passed to the plugin.
        #[arg(long)]
        args: Option<String>,
        /// Storage layout to deliver, converting if the plugin answers
        /// in the other one.
        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,
        /// Writes the raw little-endian payload here instead of JSON on
        /// stdout.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Logging format choices exposed on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum LogFormatArg {
    /// Human-readable single line output.
    Compact,
    /// Structured JSON output.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Storage layout choices exposed on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum LayoutArg {
    /// X/Y pairs in sequence.
    Interleaved,
    /// All X values, then all Y values.
    Arrays,
}

impl From<LayoutArg> for StorageLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Interleaved => Self::Interleaved,
            LayoutArg::Arrays => Self::Arrays,
        }
    }
}
