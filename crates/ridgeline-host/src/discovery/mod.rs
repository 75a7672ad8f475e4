//! Discovery of plugin executables on disk.
//!
//! Plugins are installed one per subdirectory: a candidate is a
//! subdirectory of a configured directory holding an executable named
//! after it, such as `plugins/csv_reader/csv_reader` (plus `.exe` on
//! Windows), leaving room for the plugin's support files next to it.
//! Each candidate is probed by running it once with the `--metadata`
//! flag; a well-behaved plugin prints one JSON line
//! (`{"name": …, "patterns": …}`) and exits. A candidate that fails the
//! probe is logged and skipped, never fatal: one broken plugin must not
//! hide the rest.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use ridgeline_protocol::FilePattern;

use crate::descriptor::PluginDescriptor;
use crate::error::HostError;

/// Tracing target for discovery operations.
const DISCOVERY_TARGET: &str = "ridgeline_host::discovery";

/// Flag a candidate is run with to request its metadata line.
pub const METADATA_FLAG: &str = "--metadata";

/// Default budget for a candidate to answer the metadata probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The one JSON line a candidate prints in answer to the probe.
#[derive(Debug, Deserialize)]
struct ProbeMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    patterns: Vec<FilePattern>,
}

/// Scans directories for plugin executables and probes them.
#[derive(Debug, Clone)]
pub struct Discovery {
    probe_timeout: Duration,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    /// Creates a scanner with the default probe timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Overrides the probe timeout.
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Scans the given directories in order, returning every candidate
    /// that answered the probe. Missing directories and failed probes are
    /// logged and skipped.
    #[must_use]
    pub fn scan_dirs(&self, dirs: &[PathBuf]) -> Vec<PluginDescriptor> {
        let mut found = Vec::new();
        for dir in dirs {
            found.extend(self.scan_dir(dir));
        }
        found
    }

    /// Scans one directory of plugin subdirectories.
    #[must_use]
    pub fn scan_dir(&self, dir: &Path) -> Vec<PluginDescriptor> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(
                    target: DISCOVERY_TARGET,
                    dir = %dir.display(),
                    error = %err,
                    "skipping unreadable plugin directory"
                );
                return Vec::new();
            }
        };

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| candidate_executable(&entry.path()))
            .collect();
        candidates.sort();

        let mut found = Vec::new();
        for path in candidates {
            match self.probe(&path) {
                Ok(descriptor) => {
                    debug!(
                        target: DISCOVERY_TARGET,
                        plugin = descriptor.name(),
                        path = %path.display(),
                        "discovered plugin"
                    );
                    found.push(descriptor);
                }
                Err(err) => {
                    warn!(
                        target: DISCOVERY_TARGET,
                        path = %path.display(),
                        error = %err,
                        "candidate failed metadata probe"
                    );
                }
            }
        }
        found
    }

    /// Probes one executable for its metadata.
    ///
    /// Runs `<path> --metadata` and reads the first stdout line within
    /// the probe timeout. A candidate reporting no name falls back to
    /// a display name derived from its file stem.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ProbeFailed`] when the candidate cannot be
    /// run, prints no metadata, prints invalid metadata, or exceeds the
    /// timeout.
    pub fn probe(&self, path: &Path) -> Result<PluginDescriptor, HostError> {
        let mut child = Command::new(path)
            .arg(METADATA_FLAG)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| probe_failed(path, err.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| probe_failed(path, "failed to capture stdout"))?;

        // The read happens on a helper thread so a silent candidate
        // cannot block discovery past the timeout. Killing the child
        // closes the pipe and unblocks the reader.
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            let result = BufReader::new(stdout).read_line(&mut line).map(|_| line);
            drop(sender.send(result));
        });

        let outcome = receiver.recv_timeout(self.probe_timeout);
        drop(child.kill());
        drop(child.wait());

        let line = match outcome {
            Ok(Ok(line)) => line,
            Ok(Err(err)) => return Err(probe_failed(path, err.to_string())),
            Err(_) => {
                return Err(probe_failed(
                    path,
                    format!("no metadata within {}ms", self.probe_timeout.as_millis()),
                ));
            }
        };

        if line.trim().is_empty() {
            return Err(probe_failed(path, "candidate printed no metadata"));
        }

        let metadata: ProbeMetadata = serde_json::from_str(line.trim())
            .map_err(|err| probe_failed(path, format!("invalid metadata: {err}")))?;

        let name = if metadata.name.is_empty() {
            fallback_name(path)
        } else {
            metadata.name
        };

        Ok(PluginDescriptor::new(name, path, metadata.patterns))
    }
}

/// Display name for a plugin that reported none: the file stem with
/// separators turned into spaces and each word title-cased, so
/// `model_selector` becomes `Model Selector`.
fn fallback_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map_or_else(|| String::from("plugin"), |stem| {
            stem.to_string_lossy().into_owned()
        });
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn probe_failed(path: &Path, message: impl Into<String>) -> HostError {
    HostError::ProbeFailed {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// The executable a plugin subdirectory must hold to be a candidate:
/// same name as the directory, platform executable suffix appended.
fn candidate_executable(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    let name = dir.file_name()?;
    let executable = dir.join(format!(
        "{}{}",
        name.to_string_lossy(),
        std::env::consts::EXE_SUFFIX
    ));
    is_executable(&executable).then_some(executable)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests;
