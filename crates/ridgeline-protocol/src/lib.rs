//! Wire protocol for the Ridgeline out-of-process plugin runtime.
//!
//! The host and its plugins exchange newline-delimited JSON messages over
//! the plugin's standard input and output. The host writes one
//! [`HostRequest`] line; the plugin answers with one line that decodes into
//! a [`PluginMessage`]. A `binary` message is a header line immediately
//! followed by exactly `length` raw bytes of little-endian IEEE-754 64-bit
//! floats, with no terminator; the header is the only length signal.
//!
//! This crate is the stateless codec layer: every call is independent, and
//! decode failures are per-message errors the caller can recover from. The
//! session machinery that keeps the stream unambiguous lives in
//! `ridgeline-host`.

pub mod chart;
pub mod error;
pub mod frame;
pub mod message;

pub use self::chart::{
    AxisConfig, AxisGroupConfig, ChartConfig, FilePattern, GridConfig, SeriesConfig, SubPlot,
};
pub use self::error::ProtocolError;
pub use self::frame::{BinaryFrame, FrameHeader, POINT_STRIDE, StorageLayout, convert_layout};
pub use self::message::{
    CANCELLED, FormAnswer, FormUpdate, HostRequest, LogLevel, LogMessage, PluginInfo,
    PluginMessage, RequestMethod, ShowFormRequest,
};
