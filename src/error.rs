//! Error types for tracewire.

use thiserror::Error;

/// Main error type for all tracewire operations.
#[derive(Debug, Error)]
pub enum TracewireError {
    /// I/O error during transport operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON record encoding/decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack record encoding error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack record decoding error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Protocol error (corrupt stream, oversized frame, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport closed underneath a send.
    #[error("Transport closed")]
    TransportClosed,
}

/// Result type alias using TracewireError.
pub type Result<T> = std::result::Result<T, TracewireError>;
