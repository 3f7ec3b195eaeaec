//! Message framing codec.

use crate::{Command, Message, ProtocolError, COMMAND_SIZE, MAX_PAYLOAD};
use bytes::{Buf, BufMut, BytesMut};
use sha2::{Digest, Sha256};
use tokio_util::codec::{Decoder, Encoder};

/// Header size: magic (4) + command (12) + length (4) + checksum (4).
const HEADER_SIZE: usize = 24;

/// Framing codec for crawler messages.
///
/// Frames are validated in order: magic, declared length, checksum.
/// Each failure is a distinct [`ProtocolError`] variant so callers can
/// tell a foreign network from a corrupt frame.
pub struct MessageCodec {
    /// Network magic bytes.
    magic: [u8; 4],
    /// Maximum allowed payload size.
    max_payload: usize,
}

impl MessageCodec {
    /// Create a codec for the given network magic.
    pub fn new(magic: [u8; 4]) -> Self {
        Self {
            magic,
            max_payload: MAX_PAYLOAD,
        }
    }

    /// Checksum for a payload: first 4 bytes of SHA-256(SHA-256(payload)).
    fn checksum(payload: &[u8]) -> [u8; 4] {
        let first = Sha256::digest(payload);
        let second = Sha256::digest(first);

        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(&second[0..4]);
        checksum
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        // Parse the header without consuming
        if src[0..4] != self.magic {
            return Err(ProtocolError::WrongNetwork);
        }

        let mut command = [0u8; COMMAND_SIZE];
        command.copy_from_slice(&src[4..16]);

        let length = u32::from_le_bytes([src[16], src[17], src[18], src[19]]) as usize;
        if length > self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: length,
                max: self.max_payload,
            });
        }

        let mut expected = [0u8; 4];
        expected.copy_from_slice(&src[20..24]);

        let total = HEADER_SIZE + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(length).freeze();

        if Self::checksum(&payload) != expected {
            return Err(ProtocolError::ChecksumMismatch);
        }

        Ok(Some(Message {
            command: Command::from_header(&command),
            payload,
        }))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = item.payload.len();
        if length > self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: length,
                max: self.max_payload,
            });
        }

        let command = item.command.to_header()?;
        let checksum = Self::checksum(&item.payload);

        dst.reserve(HEADER_SIZE + length);
        dst.put_slice(&self.magic);
        dst.put_slice(&command);
        dst.put_u32_le(length as u32);
        dst.put_slice(&checksum);
        dst.put_slice(&item.payload);

        Ok(())
    }
}
