//! Typed protocol messages.

use crate::{ProtocolError, ProtocolResult};
use bytes::Bytes;
use std::fmt;

/// Width of the command field in the frame header.
pub const COMMAND_SIZE: usize = 12;

/// Command names the crawler understands.
///
/// Anything else decodes as [`Command::Other`] and is ignored by the
/// crawl driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Version,
    Verack,
    Addr,
    GetAddr,
    Other(String),
}

impl Command {
    /// The ASCII command name.
    pub fn as_str(&self) -> &str {
        match self {
            Command::Version => "version",
            Command::Verack => "verack",
            Command::Addr => "addr",
            Command::GetAddr => "getaddr",
            Command::Other(name) => name,
        }
    }

    /// Decode from the NUL-padded header field.
    pub fn from_header(field: &[u8; COMMAND_SIZE]) -> Self {
        let end = field.iter().position(|&b| b == 0).unwrap_or(COMMAND_SIZE);
        let name = String::from_utf8_lossy(&field[..end]);

        match name.as_ref() {
            "version" => Command::Version,
            "verack" => Command::Verack,
            "addr" => Command::Addr,
            "getaddr" => Command::GetAddr,
            other => Command::Other(other.to_string()),
        }
    }

    /// Encode as the NUL-padded header field.
    pub fn to_header(&self) -> ProtocolResult<[u8; COMMAND_SIZE]> {
        let name = self.as_str().as_bytes();
        if name.len() > COMMAND_SIZE {
            return Err(ProtocolError::InvalidPayload(format!(
                "command name too long: {:?}",
                self.as_str()
            )));
        }

        let mut field = [0u8; COMMAND_SIZE];
        field[..name.len()].copy_from_slice(name);
        Ok(field)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A framed protocol message: a command plus its opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Command name.
    pub command: Command,
    /// Raw payload bytes, up to [`crate::MAX_PAYLOAD`].
    pub payload: Bytes,
}

impl Message {
    /// Create a message from parts.
    pub fn new(command: Command, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// An empty `getaddr` request.
    pub fn getaddr() -> Self {
        Self::new(Command::GetAddr, Bytes::new())
    }

    /// An empty `verack` acknowledgement.
    pub fn verack() -> Self {
        Self::new(Command::Verack, Bytes::new())
    }
}
