//! Half-duplex call sessions with plugin processes.
//!
//! [`PluginSession`] owns one plugin's stdin and stdout and enforces the
//! call protocol: the host writes exactly one request line, then reads
//! until it has the one reply that request is owed. Log messages may
//! interleave anywhere on the reply stream and are forwarded to tracing;
//! a binary header obliges the session to drain the payload before
//! anything else is read. During `initialize` the plugin may open a form
//! exchange, which the session relays to the caller's [`DialogHost`].
//!
//! A session is poisoned (permanently closed) when the stream position
//! stops being trustworthy: on EOF, on an I/O error, on a failed payload
//! drain, on a torn frame header, or when a reply shape does not match
//! the outstanding request. A per-line decode failure or a
//! plugin-reported `error` leaves the session usable.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use ridgeline_protocol::{
    BinaryFrame, ChartConfig, FormAnswer, FormUpdate, FrameHeader, HostRequest, LogLevel,
    LogMessage, PluginInfo, PluginMessage, ProtocolError, RequestMethod, SeriesConfig,
    ShowFormRequest, StorageLayout,
};

use crate::error::HostError;
use crate::form::DialogHost;

/// Tracing target for session operations.
const SESSION_TARGET: &str = "ridgeline_host::session";

/// How long a closed plugin gets to exit before it is killed.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Poll interval while waiting for a closed plugin to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Running,
    Stopped,
}

/// One non-log reply read off the stream.
enum Reply {
    Value(Value),
    Frame(BinaryFrame),
    Info(PluginInfo),
    ShowForm(ShowFormRequest),
    FormUpdate(FormUpdate),
}

impl Reply {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "result",
            Self::Frame(_) => "binary",
            Self::Info(_) => "info",
            Self::ShowForm(_) => "show_form",
            Self::FormUpdate(_) => "form_update",
        }
    }
}

/// A synchronous call session with one plugin process.
///
/// Methods take `&mut self`: the half-duplex protocol admits exactly one
/// outstanding request, and exclusive access is what guarantees it.
pub struct PluginSession {
    name: String,
    reader: Box<dyn BufRead + Send>,
    writer: Option<Box<dyn Write + Send>>,
    child: Option<Child>,
    state: SessionState,
}

impl PluginSession {
    /// Spawns the plugin executable and wires a session over its stdio.
    ///
    /// The plugin's stderr is inherited so its diagnostics reach the
    /// host's own stderr unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::SpawnFailed`] when the process cannot be
    /// started or its pipes cannot be captured.
    pub fn spawn(name: &str, executable: &Path, args: &[String]) -> Result<Self, HostError> {
        let mut command = Command::new(executable);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        debug!(
            target: SESSION_TARGET,
            plugin = name,
            executable = %executable.display(),
            "spawning plugin process"
        );

        let mut child = command.spawn().map_err(|err| HostError::SpawnFailed {
            name: name.to_owned(),
            message: err.to_string(),
            source: Some(Arc::new(err)),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| HostError::SpawnFailed {
            name: name.to_owned(),
            message: String::from("failed to capture stdin"),
            source: None,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| HostError::SpawnFailed {
            name: name.to_owned(),
            message: String::from("failed to capture stdout"),
            source: None,
        })?;

        Ok(Self {
            name: name.to_owned(),
            reader: Box::new(BufReader::new(stdout)),
            writer: Some(Box::new(stdin)),
            child: Some(child),
            state: SessionState::Running,
        })
    }

    /// Wires a session over arbitrary byte streams with no child process.
    ///
    /// Used by tests and by hosts that run a plugin over a transport other
    /// than stdio.
    pub fn from_streams(
        name: impl Into<String>,
        reader: impl BufRead + Send + 'static,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
            writer: Some(Box::new(writer)),
            child: None,
            state: SessionState::Running,
        }
    }

    /// The plugin this session talks to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the session can still carry calls.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running)
    }

    /// Queries the plugin's identity.
    ///
    /// # Errors
    ///
    /// Fails when the session is closed, the stream errors, or the reply
    /// is not an identity message.
    pub fn info(&mut self) -> Result<PluginInfo, HostError> {
        self.send(&HostRequest::info())?;
        match self.read_reply()? {
            Reply::Info(plugin_info) => Ok(plugin_info),
            other => Err(self.desync(RequestMethod::Info, other.kind())),
        }
    }

    /// Runs plugin initialisation, relaying any form exchange to `dialog`.
    ///
    /// The plugin may send `show_form` requests before its final reply;
    /// each is handed to `dialog` together with a [`FormChannel`] for live
    /// `form_change` notifications, and the returned answer is written
    /// back on the same stream. A user cancellation surfaces as a
    /// [`HostError::PluginFailure`] for which
    /// [`HostError::is_cancelled`] returns `true`.
    ///
    /// # Errors
    ///
    /// Fails when the session is closed, the stream errors, the dialog
    /// host fails, or the plugin reports an initialisation error.
    pub fn initialize(
        &mut self,
        args: Option<&str>,
        dialog: &mut dyn DialogHost,
    ) -> Result<Value, HostError> {
        self.send(&HostRequest::initialize(args.map(str::to_owned)))?;
        loop {
            match self.read_reply()? {
                Reply::Value(value) => return Ok(value),
                Reply::ShowForm(request) => {
                    let answer = dialog.show_form(&request, &mut FormChannel { session: self })?;
                    self.send_answer(&answer)?;
                }
                other => return Err(self.desync(RequestMethod::Initialize, other.kind())),
            }
        }
    }

    /// Fetches the chart configuration, with display defaults applied.
    ///
    /// # Errors
    ///
    /// Fails when the session is closed, the stream errors, or the reply
    /// does not decode as a chart configuration.
    pub fn chart_config(&mut self, args: Option<&str>) -> Result<ChartConfig, HostError> {
        self.send(&HostRequest::chart_config(args.map(str::to_owned)))?;
        match self.read_reply()? {
            Reply::Value(value) => {
                let mut config: ChartConfig = self.decode_value("chart configuration", value)?;
                config.apply_defaults();
                Ok(config)
            }
            other => Err(self.desync(RequestMethod::GetChartConfig, other.kind())),
        }
    }

    /// Fetches the series list, with display defaults applied to each entry.
    ///
    /// # Errors
    ///
    /// Fails when the session is closed, the stream errors, or the reply
    /// does not decode as a series list.
    pub fn series_config(&mut self) -> Result<Vec<SeriesConfig>, HostError> {
        self.send(&HostRequest::series_config())?;
        match self.read_reply()? {
            Reply::Value(value) => {
                let mut list: Vec<SeriesConfig> = self.decode_value("series list", value)?;
                for series in &mut list {
                    series.apply_defaults();
                }
                Ok(list)
            }
            other => Err(self.desync(RequestMethod::GetSeriesConfig, other.kind())),
        }
    }

    /// Fetches one series as a binary frame.
    ///
    /// `preferred` is a hint; the returned frame's own storage field says
    /// which layout the plugin actually used.
    ///
    /// # Errors
    ///
    /// Fails when the session is closed, the stream errors, the payload
    /// drain fails, or the reply is not a binary frame.
    pub fn series_data(
        &mut self,
        series_id: &str,
        preferred: Option<StorageLayout>,
    ) -> Result<BinaryFrame, HostError> {
        self.send(&HostRequest::series_data(series_id, preferred))?;
        match self.read_reply()? {
            Reply::Frame(frame) => Ok(frame),
            other => Err(self.desync(RequestMethod::GetSeriesData, other.kind())),
        }
    }

    /// Shuts the session down.
    ///
    /// Closing stdin signals the plugin to exit; a plugin still running
    /// after the grace period is killed. Closing an already-closed session
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Io`] when the exit status cannot be queried.
    pub fn close(&mut self) -> Result<(), HostError> {
        self.state = SessionState::Stopped;
        // Dropping stdin is the exit signal.
        self.writer = None;

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        target: SESSION_TARGET,
                        plugin = %self.name,
                        ?status,
                        "plugin process exited"
                    );
                    return Ok(());
                }
                Ok(None) => {
                    if start.elapsed() > CLOSE_GRACE {
                        warn!(
                            target: SESSION_TARGET,
                            plugin = %self.name,
                            grace_ms = u64::try_from(CLOSE_GRACE.as_millis()).unwrap_or(u64::MAX),
                            "plugin did not exit, killing process"
                        );
                        drop(child.kill());
                        drop(child.wait());
                        return Ok(());
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return Err(HostError::io(self.name.as_str(), err)),
            }
        }
    }

    /// Writes one request line to the plugin's stdin.
    fn send(&mut self, request: &HostRequest) -> Result<(), HostError> {
        let line = request
            .encode_line()
            .map_err(|source| HostError::Protocol {
                name: self.name.clone(),
                source,
            })?;
        self.write_line(&line)?;
        debug!(
            target: SESSION_TARGET,
            plugin = %self.name,
            method = %request.method(),
            "sent request"
        );
        Ok(())
    }

    /// Writes one form answer line to the plugin's stdin.
    fn send_answer(&mut self, answer: &FormAnswer) -> Result<(), HostError> {
        let line = answer.encode_line().map_err(|source| HostError::Protocol {
            name: self.name.clone(),
            source,
        })?;
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> Result<(), HostError> {
        if !self.is_running() {
            return Err(self.closed());
        }
        let name = self.name.clone();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| HostError::SessionClosed { name: name.clone() })?;
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|err| HostError::Io {
                name,
                source: Arc::new(err),
            })
    }

    /// Reads messages until a non-log reply arrives, forwarding logs.
    fn read_reply(&mut self) -> Result<Reply, HostError> {
        loop {
            match self.next_message()? {
                PluginMessage::Log(log) => forward_log(&self.name, &log),
                PluginMessage::Error(message) => {
                    return Err(HostError::PluginFailure {
                        name: self.name.clone(),
                        message,
                    });
                }
                PluginMessage::Binary(header) => {
                    return self.drain_frame(header).map(Reply::Frame);
                }
                PluginMessage::Result(value) => return Ok(Reply::Value(value)),
                PluginMessage::Info(plugin_info) => return Ok(Reply::Info(plugin_info)),
                PluginMessage::ShowForm(request) => return Ok(Reply::ShowForm(request)),
                PluginMessage::FormUpdate(update) => return Ok(Reply::FormUpdate(update)),
            }
        }
    }

    /// Reads and decodes one line from the plugin's stdout.
    fn next_message(&mut self) -> Result<PluginMessage, HostError> {
        if !self.is_running() {
            return Err(self.closed());
        }
        let mut line = String::new();
        let bytes_read = match self.reader.read_line(&mut line) {
            Ok(n) => n,
            Err(err) => {
                self.state = SessionState::Stopped;
                return Err(HostError::io(self.name.as_str(), err));
            }
        };
        if bytes_read == 0 {
            // EOF mid-protocol means the plugin died or closed stdout.
            self.state = SessionState::Stopped;
            return Err(self.closed());
        }
        match PluginMessage::decode_line(&line) {
            Ok(message) => Ok(message),
            Err(source) => {
                // A torn frame header may be followed by payload bytes the
                // reader cannot skip; everything else leaves the stream at
                // a line boundary.
                if matches!(source, ProtocolError::FrameLength { .. }) {
                    self.state = SessionState::Stopped;
                }
                Err(HostError::Protocol {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Drains a binary payload announced by `header`.
    fn drain_frame(&mut self, header: FrameHeader) -> Result<BinaryFrame, HostError> {
        let mut payload = vec![0u8; header.length()];
        if let Err(err) = self.reader.read_exact(&mut payload) {
            // A partial payload leaves the stream position unknowable.
            self.state = SessionState::Stopped;
            return Err(HostError::io(self.name.as_str(), err));
        }
        debug!(
            target: SESSION_TARGET,
            plugin = %self.name,
            bytes = header.length(),
            storage = %header.storage(),
            "drained binary payload"
        );
        BinaryFrame::new(header.storage(), payload).map_err(|source| HostError::Protocol {
            name: self.name.clone(),
            source,
        })
    }

    fn decode_value<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        value: Value,
    ) -> Result<T, HostError> {
        serde_json::from_value(value).map_err(|err| HostError::Protocol {
            name: self.name.clone(),
            source: ProtocolError::decode(format!("invalid {what}: {err}"), Some(err)),
        })
    }

    /// Marks the stream untrustworthy and reports the shape mismatch.
    fn desync(&mut self, method: RequestMethod, kind: &str) -> HostError {
        self.state = SessionState::Stopped;
        HostError::Desynchronised {
            name: self.name.clone(),
            message: format!("unexpected {kind} reply to {method}"),
        }
    }

    fn closed(&self) -> HostError {
        HostError::SessionClosed {
            name: self.name.clone(),
        }
    }
}

impl Drop for PluginSession {
    fn drop(&mut self) {
        if self.child.is_some() {
            drop(self.close());
        }
    }
}

impl std::fmt::Debug for PluginSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSession")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Live form notifications back to the plugin during a form exchange.
///
/// The channel borrows the session exclusively, so only one notification
/// can be outstanding at a time.
pub struct FormChannel<'a> {
    session: &'a mut PluginSession,
}

impl FormChannel<'_> {
    /// The plugin on the other end of the exchange.
    #[must_use]
    pub fn plugin_name(&self) -> &str {
        self.session.name()
    }

    /// Sends the current field values and waits for the plugin's update.
    ///
    /// # Errors
    ///
    /// Fails when the stream errors or the plugin answers with anything
    /// other than a form update.
    pub fn send_change(&mut self, data: Map<String, Value>) -> Result<FormUpdate, HostError> {
        self.session.send(&HostRequest::form_change(data))?;
        match self.session.read_reply()? {
            Reply::FormUpdate(update) => Ok(update),
            other => Err(self.session.desync(RequestMethod::FormChange, other.kind())),
        }
    }
}

/// Forwards a plugin log line to the host's tracing output.
fn forward_log(name: &str, log: &LogMessage) {
    match log.level() {
        LogLevel::Debug => {
            debug!(target: SESSION_TARGET, plugin = name, "{}", log.message());
        }
        LogLevel::Info => {
            info!(target: SESSION_TARGET, plugin = name, "{}", log.message());
        }
        LogLevel::Warn => {
            warn!(target: SESSION_TARGET, plugin = name, "{}", log.message());
        }
        LogLevel::Error => {
            error!(target: SESSION_TARGET, plugin = name, "{}", log.message());
        }
    }
}

#[cfg(test)]
mod tests;
