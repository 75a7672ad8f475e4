//! Binary frame format for numeric series payloads.
//!
//! A frame is a JSON header line (`{"type":"binary","length":N,"storage":S}`)
//! followed immediately by exactly `N` raw bytes: an array of IEEE-754
//! 64-bit floats in little-endian order, independent of the host platform's
//! endianness. `N` is always a multiple of 16 because every point is an
//! X/Y pair of 8-byte floats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Bytes occupied by one X/Y point pair (two little-endian f64 values).
pub const POINT_STRIDE: usize = 16;

/// How X and Y values are laid out inside a frame payload.
///
/// # Example
///
/// ```
/// use ridgeline_protocol::StorageLayout;
///
/// assert_eq!(StorageLayout::Arrays.as_str(), "arrays");
/// let parsed: StorageLayout = "interleaved".parse().expect("known layout");
/// assert_eq!(parsed, StorageLayout::Interleaved);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLayout {
    /// Point pairs in sequence: `x0, y0, x1, y1, …`.
    Interleaved,
    /// Two contiguous halves: `x0 … xn, y0 … yn`.
    Arrays,
}

impl StorageLayout {
    /// Returns the canonical wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interleaved => "interleaved",
            Self::Arrays => "arrays",
        }
    }
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageLayout {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interleaved" => Ok(Self::Interleaved),
            "arrays" => Ok(Self::Arrays),
            other => Err(ProtocolError::UnknownStorage {
                value: other.to_owned(),
            }),
        }
    }
}

/// Decoded header of a binary frame.
///
/// The header is the authoritative and only length signal: the reader must
/// drain exactly [`FrameHeader::length`] bytes from the stream before it
/// can be used for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    length: usize,
    storage: StorageLayout,
}

impl FrameHeader {
    /// Creates a header, validating that the length is a whole number of
    /// point pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameLength`] when `length` is not a
    /// multiple of [`POINT_STRIDE`].
    pub const fn new(length: usize, storage: StorageLayout) -> Result<Self, ProtocolError> {
        if length % POINT_STRIDE != 0 {
            return Err(ProtocolError::FrameLength { length });
        }
        Ok(Self { length, storage })
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Declared storage layout of the payload.
    #[must_use]
    pub const fn storage(&self) -> StorageLayout {
        self.storage
    }

    /// Number of X/Y points in the payload.
    #[must_use]
    pub const fn point_count(&self) -> usize {
        self.length / POINT_STRIDE
    }

    /// Serialises the header as one JSON line terminated by a newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}\n",
            serde_json::json!({
                "type": "binary",
                "length": self.length,
                "storage": self.storage,
            })
        )
    }
}

/// An owned binary frame: header metadata plus the raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFrame {
    storage: StorageLayout,
    payload: Vec<u8>,
}

impl BinaryFrame {
    /// Wraps a drained payload, validating its length.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameLength`] when the payload is not a
    /// whole number of point pairs.
    pub fn new(storage: StorageLayout, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if payload.len() % POINT_STRIDE != 0 {
            return Err(ProtocolError::FrameLength {
                length: payload.len(),
            });
        }
        Ok(Self { storage, payload })
    }

    /// Encodes a slice of f64 values as a little-endian payload.
    ///
    /// The slice holds `2 * point_count` values arranged per `storage`;
    /// the byte order is fixed little-endian on every platform.
    #[must_use]
    pub fn from_values(values: &[f64], storage: StorageLayout) -> Self {
        let mut payload = Vec::with_capacity(values.len() * 8);
        for value in values {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        Self { storage, payload }
    }

    /// Storage layout of the payload.
    #[must_use]
    pub const fn storage(&self) -> StorageLayout {
        self.storage
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` when the frame holds no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Number of X/Y points in the frame.
    #[must_use]
    pub const fn point_count(&self) -> usize {
        self.payload.len() / POINT_STRIDE
    }

    /// Header describing this frame.
    ///
    /// # Panics
    ///
    /// Never panics: the length invariant is checked on construction.
    #[must_use]
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            length: self.payload.len(),
            storage: self.storage,
        }
    }

    /// Decodes the payload into f64 values in payload order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.payload
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect()
    }

    /// Consumes the frame, returning the raw payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Re-encodes the frame in the requested layout.
    ///
    /// A no-op when the frame already uses `target`.
    #[must_use]
    pub fn into_layout(self, target: StorageLayout) -> Self {
        if self.storage == target {
            return self;
        }
        let converted = convert_layout(&self.values(), self.storage, target);
        Self::from_values(&converted, target)
    }
}

/// Converts a series between storage layouts.
///
/// Assumes `values` holds equal-length X and Y halves (an even number of
/// entries). Converting twice returns the original order: the function is
/// its own inverse.
///
/// # Example
///
/// ```
/// use ridgeline_protocol::{StorageLayout, convert_layout};
///
/// let interleaved = [0.0, 10.0, 1.0, 11.0, 2.0, 12.0];
/// let arrays = convert_layout(
///     &interleaved,
///     StorageLayout::Interleaved,
///     StorageLayout::Arrays,
/// );
/// assert_eq!(arrays, [0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
/// ```
#[must_use]
pub fn convert_layout(values: &[f64], from: StorageLayout, to: StorageLayout) -> Vec<f64> {
    if from == to {
        return values.to_vec();
    }
    match from {
        StorageLayout::Interleaved => {
            let mut xs = Vec::with_capacity(values.len() / 2);
            let mut ys = Vec::with_capacity(values.len() / 2);
            for pair in values.chunks_exact(2) {
                if let [x, y] = pair {
                    xs.push(*x);
                    ys.push(*y);
                }
            }
            xs.extend_from_slice(&ys);
            xs
        }
        StorageLayout::Arrays => {
            let (xs, ys) = values.split_at(values.len() / 2);
            xs.iter()
                .zip(ys.iter())
                .flat_map(|(x, y)| [*x, *y])
                .collect()
        }
    }
}
