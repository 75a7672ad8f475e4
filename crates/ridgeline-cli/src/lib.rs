//! Command line front end for the Ridgeline plugin host.
//!
//! Wraps the plugin host crates in a small set of commands: listing and
//! probing plugins, and driving a single plugin through its chart and
//! series calls. All diagnostics go to stderr through `tracing`; stdout
//! is reserved for command output so it can be piped.

mod cli;
mod commands;
mod error;
pub mod telemetry;

pub use error::CliError;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;

/// Parses the arguments, runs the selected command, and reports the
/// outcome as an exit code.
///
/// Help and version requests print to stderr and exit successfully;
/// everything clap rejects exits with failure. Command errors are
/// rendered on one line prefixed with the program name.
pub fn run<I, T>(args: I, stdout: &mut dyn Write, stderr: &mut dyn Write) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            drop(write!(stderr, "{err}"));
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    match commands::execute(&cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            drop(writeln!(stderr, "ridgeline: {err}"));
            ExitCode::FAILURE
        }
    }
}
