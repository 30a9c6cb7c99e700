//! Error types for berrymed-oximeter.

use thiserror::Error;

/// Main error type for all oximeter operations.
#[derive(Debug, Error)]
pub enum OximeterError {
    /// Frame candidate does not have exactly `FRAME_LEN` bytes.
    #[error("Framing mismatch: expected 5 bytes, got {len}")]
    FramingMismatch {
        /// Length of the rejected group.
        len: usize,
    },

    /// A byte could not be decoded according to its bit layout.
    #[error("Field decode error: {0}")]
    FieldDecode(String),

    /// A field value does not fit the width its layout reserves for it.
    #[error("Field encode error: {0}")]
    FieldEncode(String),

    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-specific failure (adapter, radio stack, etc.).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Transport closed; no more deliveries will arrive.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Sample consumer went away.
    #[error("Sink closed")]
    SinkClosed,

    /// JSON serialization error (sample sinks).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

/// Reason code reported to sinks when a frame is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Group length was not 5.
    FramingMismatch,
    /// Bit layout could not be applied.
    FieldDecode,
}

impl OximeterError {
    /// Reason code if this error is a per-frame rejection.
    ///
    /// Returns `None` for transport and codec errors, which are not
    /// attributable to a single frame.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::FramingMismatch { .. } => Some(RejectReason::FramingMismatch),
            Self::FieldDecode(_) => Some(RejectReason::FieldDecode),
            _ => None,
        }
    }
}

/// Result type alias using OximeterError.
pub type Result<T> = std::result::Result<T, OximeterError>;
