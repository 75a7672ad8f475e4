//! Unit tests for the call session over in-memory streams.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use serde_json::{Map, json};

use super::*;
use crate::form::{DialogHost, NoopDialogHost};

/// Captures everything the session writes so tests can inspect it after
/// the writer has been moved into the session.
#[derive(Clone, Default)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("writer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedWriter {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().expect("writer lock").clone()).expect("utf8 output")
    }
}

fn session_with(script: Vec<u8>) -> (PluginSession, SharedWriter) {
    let writer = SharedWriter::default();
    let session = PluginSession::from_streams("test-plugin", Cursor::new(script), writer.clone());
    (session, writer)
}

fn lines(parts: &[&str]) -> Vec<u8> {
    let mut script = Vec::new();
    for part in parts {
        script.extend_from_slice(part.as_bytes());
        script.push(b'\n');
    }
    script
}

// ---------------------------------------------------------------------------
// Simple calls
// ---------------------------------------------------------------------------

#[test]
fn info_round_trips() {
    let (mut session, writer) = session_with(lines(&[r#"{"name":"CSV Reader","version":1}"#]));
    let plugin_info = session.info().expect("info succeeds");
    assert_eq!(plugin_info.name(), "CSV Reader");
    assert_eq!(plugin_info.version(), 1);
    assert_eq!(writer.contents(), "{\"method\":\"info\"}\n");
}

#[test]
fn logs_interleave_with_any_reply() {
    let (mut session, _writer) = session_with(lines(&[
        r#"{"method":"log","level":"info","message":"starting"}"#,
        r#"{"method":"log","level":"debug","message":"probing"}"#,
        r#"{"name":"CSV Reader","version":1}"#,
    ]));
    let plugin_info = session.info().expect("info succeeds");
    assert_eq!(plugin_info.name(), "CSV Reader");
}

#[test]
fn plugin_error_is_reported_without_closing_the_session() {
    let (mut session, _writer) = session_with(lines(&[
        r#"{"error":"file not found"}"#,
        r#"{"name":"CSV Reader","version":1}"#,
    ]));
    let err = session
        .initialize(Some("path=/missing"), &mut NoopDialogHost)
        .expect_err("plugin reported failure");
    assert!(matches!(err, HostError::PluginFailure { message, .. } if message == "file not found"));
    assert!(session.is_running());
    session.info().expect("session still usable");
}

#[test]
fn chart_config_applies_display_defaults() {
    let (mut session, _writer) =
        session_with(lines(&[r#"{"result":{"title":"Voltage over time"}}"#]));
    let config = session.chart_config(None).expect("chart config");
    assert_eq!(config.title, "Voltage over time");
    assert_eq!(
        config.grid,
        Some(ridgeline_protocol::GridConfig { rows: 1, cols: 1 })
    );
    assert_eq!(config.axes.len(), 1);
}

#[test]
fn series_config_applies_display_defaults() {
    let (mut session, _writer) =
        session_with(lines(&[r#"{"result":[{"id":"s0","name":"Voltage"}]}"#]));
    let list = session.series_config().expect("series config");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].line_type, "solid");
    assert_eq!(list[0].visible, Some(true));
}

// ---------------------------------------------------------------------------
// Binary frames
// ---------------------------------------------------------------------------

#[test]
fn series_data_drains_exactly_the_declared_payload() {
    let frame = BinaryFrame::from_values(&[1.0, 10.0, 2.0, 20.0], StorageLayout::Arrays);
    let mut script = lines(&[
        r#"{"method":"log","level":"info","message":"loading"}"#,
        r#"{"type":"binary","length":32,"storage":"arrays"}"#,
    ]);
    script.extend_from_slice(frame.payload());
    script.extend_from_slice(&lines(&[r#"{"name":"CSV Reader","version":1}"#]));

    let (mut session, _writer) = session_with(script);
    let received = session
        .series_data("s0", Some(StorageLayout::Arrays))
        .expect("series data");
    assert_eq!(received, frame);
    // The stream is positioned exactly after the payload.
    session.info().expect("next call reads the next line");
}

#[test]
fn truncated_payload_poisons_the_session() {
    let mut script = lines(&[r#"{"type":"binary","length":32,"storage":"interleaved"}"#]);
    script.extend_from_slice(&[0u8; 8]);

    let (mut session, _writer) = session_with(script);
    let err = session.series_data("s0", None).expect_err("short payload");
    assert!(matches!(err, HostError::Io { .. }));
    assert!(!session.is_running());
    let err = session.info().expect_err("session is poisoned");
    assert!(matches!(err, HostError::SessionClosed { .. }));
}

#[test]
fn torn_frame_header_is_rejected() {
    let (mut session, _writer) =
        session_with(lines(&[r#"{"type":"binary","length":17,"storage":"interleaved"}"#]));
    let err = session.series_data("s0", None).expect_err("torn length");
    assert!(matches!(
        err,
        HostError::Protocol {
            source: ProtocolError::FrameLength { length: 17 },
            ..
        }
    ));
    // Payload bytes may follow the bad header, so the stream is unusable.
    assert!(!session.is_running());
}

// ---------------------------------------------------------------------------
// Stream failure modes
// ---------------------------------------------------------------------------

#[test]
fn eof_poisons_the_session() {
    let (mut session, _writer) = session_with(Vec::new());
    let err = session.info().expect_err("no reply");
    assert!(matches!(err, HostError::SessionClosed { .. }));
    assert!(!session.is_running());
}

#[test]
fn malformed_line_is_recoverable() {
    let (mut session, _writer) = session_with(lines(&[
        "not json at all",
        r#"{"name":"CSV Reader","version":1}"#,
    ]));
    let err = session.info().expect_err("malformed line");
    assert!(matches!(err, HostError::Protocol { .. }));
    assert!(session.is_running());
    session.info().expect("retry reads the next line");
}

#[test]
fn unexpected_reply_shape_desynchronises() {
    let (mut session, _writer) = session_with(lines(&[r#"{"result":{"rows":1}}"#]));
    let err = session.info().expect_err("wrong shape");
    assert!(matches!(err, HostError::Desynchronised { .. }));
    assert!(!session.is_running());
}

#[test]
fn calls_after_close_are_rejected() {
    let (mut session, _writer) =
        session_with(lines(&[r#"{"name":"CSV Reader","version":1}"#]));
    session.close().expect("close succeeds");
    let err = session.info().expect_err("closed session");
    assert!(matches!(err, HostError::SessionClosed { .. }));
}

// ---------------------------------------------------------------------------
// Form exchange
// ---------------------------------------------------------------------------

struct CancelDialog;

impl DialogHost for CancelDialog {
    fn show_form(
        &mut self,
        _request: &ShowFormRequest,
        _channel: &mut FormChannel<'_>,
    ) -> Result<FormAnswer, HostError> {
        Ok(FormAnswer::Cancelled)
    }
}

struct LiveEditDialog;

impl DialogHost for LiveEditDialog {
    fn show_form(
        &mut self,
        _request: &ShowFormRequest,
        channel: &mut FormChannel<'_>,
    ) -> Result<FormAnswer, HostError> {
        let mut edit = Map::new();
        edit.insert("noise".into(), json!(0.5));
        let update = channel.send_change(edit)?;
        Ok(FormAnswer::Submitted(
            update.data().cloned().unwrap_or_default(),
        ))
    }
}

#[test]
fn initialize_relays_forms_to_the_dialog_host() {
    let (mut session, writer) = session_with(lines(&[
        r#"{"method":"show_form","title":"Import options","schema":{"type":"object"},"uiSchema":{},"data":{"x_column":"time"}}"#,
        r#"{"result":{"ok":true}}"#,
    ]));
    let value = session
        .initialize(None, &mut NoopDialogHost)
        .expect("initialize succeeds");
    assert_eq!(value["ok"], true);

    let written = writer.contents();
    assert!(written.contains(r#""method":"initialize""#));
    assert!(written.contains(r#"{"result":{"x_column":"time"}}"#));
}

#[test]
fn form_change_notifications_round_trip() {
    let (mut session, writer) = session_with(lines(&[
        r#"{"method":"show_form","title":"Model","schema":{"type":"object"},"uiSchema":{},"handle_form_change":true}"#,
        r#"{"data":{"noise":0.75}}"#,
        r#"{"result":{"done":true}}"#,
    ]));
    let value = session
        .initialize(None, &mut LiveEditDialog)
        .expect("initialize succeeds");
    assert_eq!(value["done"], true);

    let written = writer.contents();
    assert!(written.contains(r#""method":"form_change""#));
    assert!(written.contains(r#"{"result":{"noise":0.75}}"#));
}

#[test]
fn cancelled_form_surfaces_as_a_cancellation() {
    let (mut session, writer) = session_with(lines(&[
        r#"{"method":"show_form","title":"Import options","schema":{},"uiSchema":{}}"#,
        r#"{"error":"cancelled"}"#,
        r#"{"result":{"title":"Recovered"}}"#,
    ]));
    let err = session
        .initialize(None, &mut CancelDialog)
        .expect_err("user cancelled");
    assert!(err.is_cancelled());
    assert!(writer.contents().contains(r#"{"error":"cancelled"}"#));

    // Cancellation is a normal failure, not a poisoning: the session
    // keeps serving calls.
    assert!(session.is_running());
    let config = session
        .chart_config(None)
        .expect("session survives the cancellation");
    assert_eq!(config.title, "Recovered");
}

#[test]
fn second_form_may_follow_a_submitted_one() {
    let (mut session, _writer) = session_with(lines(&[
        r#"{"method":"show_form","title":"Step one","schema":{},"uiSchema":{}}"#,
        r#"{"method":"show_form","title":"Step two","schema":{},"uiSchema":{}}"#,
        r#"{"result":{}}"#,
    ]));
    session
        .initialize(None, &mut NoopDialogHost)
        .expect("both forms submitted");
}
