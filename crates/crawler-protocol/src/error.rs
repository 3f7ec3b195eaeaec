//! Protocol error types.

use thiserror::Error;

/// Errors produced while framing or parsing protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame carried a magic value for a different network.
    #[error("wrong network magic")]
    WrongNetwork,

    /// Payload length exceeds the allowed maximum.
    #[error("payload too large: {size} bytes, max {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Frame checksum does not match the payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Payload does not match its declared grammar.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// I/O error surfaced through the codec.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
