//! Network error types.

use crawler_protocol::ProtocolError;
use thiserror::Error;

/// Network errors.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Operation did not complete within its deadline.
    #[error("timeout: {0}")]
    Timeout(&'static str),

    /// Peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Peer sent something other than what the handshake requires.
    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: String,
    },

    /// Framing or payload error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;
