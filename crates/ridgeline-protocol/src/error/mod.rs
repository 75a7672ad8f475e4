//! Codec errors raised while encoding or decoding wire messages.
//!
//! All errors use `thiserror`-derived enums with structured context. A
//! [`ProtocolError::Decode`] is recoverable per message; frame-level errors
//! indicate the stream can no longer be trusted and are treated as fatal by
//! the session layer.

use thiserror::Error;

/// Errors arising from the wire codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A message line was not valid JSON or did not match any known shape.
    #[error("failed to decode plugin message: {message}")]
    Decode {
        /// Human-readable description of the parse failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A message could not be serialised to JSON.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A binary frame header declared a length that is not a whole number
    /// of X/Y point pairs.
    #[error("binary frame length {length} is not a multiple of 16")]
    FrameLength {
        /// The declared payload length in bytes.
        length: usize,
    },

    /// A storage layout string was neither `interleaved` nor `arrays`.
    #[error("unknown storage layout '{value}'")]
    UnknownStorage {
        /// The rejected layout string.
        value: String,
    },
}

impl ProtocolError {
    /// Builds a decode error from a JSON parse failure.
    #[must_use]
    pub fn decode(message: impl Into<String>, source: Option<serde_json::Error>) -> Self {
        Self::Decode {
            message: message.into(),
            source,
        }
    }
}
