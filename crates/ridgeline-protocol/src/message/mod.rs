//! Request and response message types for host–plugin communication.
//!
//! The host writes one [`HostRequest`] line to the plugin's stdin and reads
//! lines that decode into [`PluginMessage`] values. Incoming lines carry no
//! envelope; each one is classified by inspecting its discriminating fields
//! (`method`, `error`, `type`, and so on) and narrowed to a concrete
//! variant. A line never mixes a binary-frame header with a `result` or
//! `error`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::frame::{FrameHeader, StorageLayout};

/// Error string a host sends to abandon an open form exchange.
pub const CANCELLED: &str = "cancelled";

/// Verbs the host may send to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMethod {
    /// Query the plugin's name and API version.
    Info,
    /// Run plugin initialisation; may nest a form exchange.
    Initialize,
    /// Fetch the chart display configuration.
    GetChartConfig,
    /// Fetch the list of available series.
    GetSeriesConfig,
    /// Fetch one series as a binary frame.
    GetSeriesData,
    /// Notify the plugin of live form field edits.
    FormChange,
}

impl RequestMethod {
    /// Returns the canonical wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Initialize => "initialize",
            Self::GetChartConfig => "get_chart_config",
            Self::GetSeriesConfig => "get_series_config",
            Self::GetSeriesData => "get_series_data",
            Self::FormChange => "form_change",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request sent from the host to a plugin as a single JSON line.
///
/// # Example
///
/// ```
/// use ridgeline_protocol::{HostRequest, StorageLayout};
///
/// let request = HostRequest::series_data("s0", Some(StorageLayout::Arrays));
/// let line = request.encode_line().expect("encodes");
/// assert!(line.ends_with('\n'));
/// assert!(line.contains(r#""method":"get_series_data""#));
/// assert!(line.contains(r#""preferred_storage":"arrays""#));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRequest {
    method: RequestMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preferred_storage: Option<StorageLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
}

impl HostRequest {
    const fn bare(method: RequestMethod) -> Self {
        Self {
            method,
            args: None,
            series_id: None,
            preferred_storage: None,
            data: None,
        }
    }

    /// Builds an `info` request.
    #[must_use]
    pub const fn info() -> Self {
        Self::bare(RequestMethod::Info)
    }

    /// Builds an `initialize` request with an optional init string.
    #[must_use]
    pub fn initialize(args: Option<String>) -> Self {
        Self {
            args,
            ..Self::bare(RequestMethod::Initialize)
        }
    }

    /// Builds a `get_chart_config` request.
    #[must_use]
    pub fn chart_config(args: Option<String>) -> Self {
        Self {
            args,
            ..Self::bare(RequestMethod::GetChartConfig)
        }
    }

    /// Builds a `get_series_config` request.
    #[must_use]
    pub const fn series_config() -> Self {
        Self::bare(RequestMethod::GetSeriesConfig)
    }

    /// Builds a `get_series_data` request with an optional layout hint.
    #[must_use]
    pub fn series_data(series_id: impl Into<String>, preferred: Option<StorageLayout>) -> Self {
        Self {
            series_id: Some(series_id.into()),
            preferred_storage: preferred,
            ..Self::bare(RequestMethod::GetSeriesData)
        }
    }

    /// Builds a `form_change` notification carrying live field values.
    #[must_use]
    pub fn form_change(data: Map<String, Value>) -> Self {
        Self {
            data: Some(data),
            ..Self::bare(RequestMethod::FormChange)
        }
    }

    /// The request verb.
    #[must_use]
    pub const fn method(&self) -> RequestMethod {
        self.method
    }

    /// The opaque init/config argument string, when present.
    #[must_use]
    pub fn args(&self) -> Option<&str> {
        self.args.as_deref()
    }

    /// The target series id, when present.
    #[must_use]
    pub fn series_id(&self) -> Option<&str> {
        self.series_id.as_deref()
    }

    /// The requested storage layout hint, when present.
    #[must_use]
    pub const fn preferred_storage(&self) -> Option<StorageLayout> {
        self.preferred_storage
    }

    /// The form field values, when present.
    #[must_use]
    pub const fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    /// Serialises the request as one JSON line terminated by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] when serialisation fails.
    pub fn encode_line(&self) -> Result<String, ProtocolError> {
        let mut line = serde_json::to_string(self).map_err(ProtocolError::Encode)?;
        line.push('\n');
        Ok(line)
    }
}

/// Severity of a plugin-emitted log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Routine progress information.
    Info,
    /// Something suspicious but recoverable.
    Warn,
    /// A failure the plugin wants surfaced.
    Error,
}

impl LogLevel {
    /// Parses a wire level string; unrecognised levels fall back to `info`,
    /// matching the host's historical behaviour.
    #[must_use]
    pub fn parse(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    /// Returns the canonical wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// An asynchronous log line emitted by a plugin.
///
/// Log messages may interleave with any response except a binary payload
/// drain; the session forwards them to the host's tracing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    level: LogLevel,
    message: String,
}

impl LogMessage {
    /// Creates a log message.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Severity of the message.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// The message text.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A plugin's self-identification, returned by the `info` verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    name: String,
    version: u32,
}

impl PluginInfo {
    /// Creates an identity record.
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// The plugin's display name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The protocol API version the plugin implements.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }
}

/// A plugin-initiated request to render a configuration form.
///
/// Sent only while the plugin's `initialize` call is outstanding; the host
/// answers on the same stream with a [`FormAnswer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShowFormRequest {
    title: String,
    schema: Value,
    ui_schema: Value,
    data: Option<Map<String, Value>>,
    handle_form_change: bool,
}

impl ShowFormRequest {
    /// Creates a form request with the given title and schemas.
    #[must_use]
    pub fn new(title: impl Into<String>, schema: Value, ui_schema: Value) -> Self {
        Self {
            title: title.into(),
            schema,
            ui_schema,
            data: None,
            handle_form_change: false,
        }
    }

    /// Attaches initial field values.
    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Requests live `form_change` notifications from the host.
    #[must_use]
    pub const fn with_form_change(mut self) -> Self {
        self.handle_form_change = true;
        self
    }

    /// The dialog title.
    #[must_use]
    pub const fn title(&self) -> &str {
        self.title.as_str()
    }

    /// The JSON Schema describing the form fields.
    #[must_use]
    pub const fn schema(&self) -> &Value {
        &self.schema
    }

    /// The UI Schema describing widget hints.
    #[must_use]
    pub const fn ui_schema(&self) -> &Value {
        &self.ui_schema
    }

    /// Initial field values, when supplied.
    #[must_use]
    pub const fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    /// Whether the plugin wants live `form_change` notifications.
    #[must_use]
    pub const fn handle_form_change(&self) -> bool {
        self.handle_form_change
    }
}

/// A plugin's reply to a `form_change` notification.
///
/// An empty update (`{}`) means the form is unchanged; a populated one
/// replaces the schemas and/or field values currently on screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormUpdate {
    schema: Option<Value>,
    ui_schema: Option<Value>,
    data: Option<Map<String, Value>>,
}

impl FormUpdate {
    /// Creates an update replacing schemas and field values.
    #[must_use]
    pub const fn new(
        schema: Option<Value>,
        ui_schema: Option<Value>,
        data: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            schema,
            ui_schema,
            data,
        }
    }

    /// The empty update: no UI change required.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(None, None, None)
    }

    /// Returns `true` when the update carries nothing.
    #[must_use]
    pub const fn is_no_change(&self) -> bool {
        self.schema.is_none() && self.ui_schema.is_none() && self.data.is_none()
    }

    /// Replacement JSON Schema, when present.
    #[must_use]
    pub const fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    /// Replacement UI Schema, when present.
    #[must_use]
    pub const fn ui_schema(&self) -> Option<&Value> {
        self.ui_schema.as_ref()
    }

    /// Replacement field values, when present.
    #[must_use]
    pub const fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }
}

/// The host's reply to a [`ShowFormRequest`], written to the plugin's stdin.
#[derive(Debug, Clone, PartialEq)]
pub enum FormAnswer {
    /// The user submitted the form with these field values.
    Submitted(Map<String, Value>),
    /// The user dismissed the form without submitting.
    Cancelled,
}

impl FormAnswer {
    /// Serialises the answer as one JSON line terminated by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] when serialisation fails.
    pub fn encode_line(&self) -> Result<String, ProtocolError> {
        let value = match self {
            Self::Submitted(fields) => serde_json::json!({ "result": fields }),
            Self::Cancelled => serde_json::json!({ "error": CANCELLED }),
        };
        let mut line = serde_json::to_string(&value).map_err(ProtocolError::Encode)?;
        line.push('\n');
        Ok(line)
    }
}

/// Every field a plugin message line may carry. Classification inspects the
/// discriminating fields and narrows to a [`PluginMessage`] variant.
#[derive(Debug, Default, Deserialize)]
struct WireMessage {
    method: Option<String>,
    result: Option<Value>,
    error: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    length: Option<usize>,
    storage: Option<StorageLayout>,
    name: Option<String>,
    version: Option<u32>,
    title: Option<String>,
    schema: Option<Value>,
    #[serde(rename = "uiSchema")]
    ui_schema: Option<Value>,
    data: Option<Map<String, Value>>,
    handle_form_change: Option<bool>,
    level: Option<String>,
    message: Option<String>,
}

/// One decoded message from a plugin's stdout.
///
/// The wire format distinguishes shapes only by which fields are populated;
/// this union is the typed equivalent. A [`PluginMessage::Binary`] header
/// obliges the reader to drain exactly `length` raw bytes next.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginMessage {
    /// A successful call result (`{"result": …}`).
    Result(Value),
    /// A call failure (`{"error": …}`).
    Error(String),
    /// A binary frame header; the payload follows on the stream.
    Binary(FrameHeader),
    /// The plugin's identity, replying to `info`.
    Info(PluginInfo),
    /// A plugin-initiated form request, valid only during `initialize`.
    ShowForm(ShowFormRequest),
    /// A reply to a `form_change` notification.
    FormUpdate(FormUpdate),
    /// An asynchronous log line.
    Log(LogMessage),
}

impl PluginMessage {
    /// Decodes one stdout line into a message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] for malformed JSON or an
    /// unrecognised `type` discriminator, and [`ProtocolError::FrameLength`]
    /// for a binary header declaring a torn payload. Decode failures are
    /// recoverable per call; they do not poison the stream.
    pub fn decode_line(line: &str) -> Result<Self, ProtocolError> {
        let wire: WireMessage = serde_json::from_str(line.trim()).map_err(|err| {
            ProtocolError::decode(format!("invalid JSON line: {err}"), Some(err))
        })?;
        Self::classify(wire)
    }

    fn classify(wire: WireMessage) -> Result<Self, ProtocolError> {
        if let Some(method) = wire.method.as_deref() {
            match method {
                "log" => {
                    let level = LogLevel::parse(wire.level.as_deref().unwrap_or("info"));
                    return Ok(Self::Log(LogMessage {
                        level,
                        message: wire.message.unwrap_or_default(),
                    }));
                }
                "show_form" => {
                    return Ok(Self::ShowForm(ShowFormRequest {
                        title: wire.title.unwrap_or_default(),
                        schema: wire.schema.unwrap_or(Value::Null),
                        ui_schema: wire.ui_schema.unwrap_or(Value::Null),
                        data: wire.data,
                        handle_form_change: wire.handle_form_change.unwrap_or(false),
                    }));
                }
                other => {
                    return Err(ProtocolError::decode(
                        format!("unexpected plugin-initiated method '{other}'"),
                        None,
                    ));
                }
            }
        }

        if let Some(error) = wire.error {
            return Ok(Self::Error(error));
        }

        if let Some(kind) = wire.kind.as_deref() {
            if kind != "binary" {
                return Err(ProtocolError::decode(
                    format!("unexpected message type '{kind}'"),
                    None,
                ));
            }
            let header = FrameHeader::new(
                wire.length.unwrap_or(0),
                wire.storage.unwrap_or(StorageLayout::Interleaved),
            )?;
            return Ok(Self::Binary(header));
        }

        if let (Some(name), Some(version)) = (wire.name.as_ref(), wire.version) {
            return Ok(Self::Info(PluginInfo {
                name: name.clone(),
                version,
            }));
        }

        if let Some(result) = wire.result {
            return Ok(Self::Result(result));
        }

        // Everything else is a form update; the empty object `{}` is the
        // canonical "no change" reply.
        Ok(Self::FormUpdate(FormUpdate {
            schema: wire.schema,
            ui_schema: wire.ui_schema,
            data: wire.data,
        }))
    }

    /// A short name for the message shape, used in error reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Result(_) => "result",
            Self::Error(_) => "error",
            Self::Binary(_) => "binary",
            Self::Info(_) => "info",
            Self::ShowForm(_) => "show_form",
            Self::FormUpdate(_) => "form_update",
            Self::Log(_) => "log",
        }
    }
}
