//! # crawler-protocol
//!
//! Wire protocol and shared data model for the network crawler.
//!
//! The crawler speaks the classic Bitcoin-style P2P message format:
//!
//! ```text
//! +----------+-----------+----------+----------+
//! |  Magic   |  Command  |  Length  | Checksum |
//! | 4 bytes  | 12 bytes  | 4 bytes  | 4 bytes  |
//! +----------+-----------+----------+----------+
//! |                  Payload                   |
//! |               (Length bytes)               |
//! +--------------------------------------------+
//! ```
//!
//! - Magic: network identifier (mainnet/testnet/testnet3/namecoin)
//! - Command: ASCII command name, NUL-padded on the right
//! - Length: payload length in bytes (little-endian)
//! - Checksum: first 4 bytes of SHA-256(SHA-256(payload))
//!
//! Integers are little-endian except where noted (ports and the 16-byte
//! IP field inside a network address are big-endian).
//!
//! This crate is pure: it owns the framing codec, the `version` and
//! `addr` payload grammars, and the data types shared across the
//! pipeline, but performs no I/O of its own.

mod codec;
mod endpoint;
mod error;
mod message;
mod netaddr;
mod result;
mod varint;
mod version;

pub use codec::MessageCodec;
pub use endpoint::Endpoint;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{Command, Message, COMMAND_SIZE};
pub use netaddr::{parse_addr, NetAddr, NETADDR_SIZE, NETADDR_SIZE_WITH_TIME};
pub use result::CrawlResult;
pub use varint::{read_var_int, read_var_str, write_var_int, write_var_str};
pub use version::{build_version, Version};

/// Protocol magic bytes for mainnet.
pub const MAINNET_MAGIC: [u8; 4] = [0xF9, 0xBE, 0xB4, 0xD9];

/// Protocol magic bytes for testnet.
pub const TESTNET_MAGIC: [u8; 4] = [0xFA, 0xBF, 0xB5, 0xDA];

/// Protocol magic bytes for testnet3.
pub const TESTNET3_MAGIC: [u8; 4] = [0x0B, 0x11, 0x09, 0x07];

/// Protocol magic bytes for the namecoin network.
pub const NAMECOIN_MAGIC: [u8; 4] = [0xF9, 0xBE, 0xB4, 0xFE];

/// Maximum payload size a message may carry.
pub const MAX_PAYLOAD: usize = 100 * 1024;

/// Protocol version advertised in outbound `version` messages.
/// Must be representable as a single-byte varstr length prefix.
pub const PROTOCOL_VERSION: u32 = 70001;

/// First protocol version carrying the trailing relay flag (BIP 37).
pub const VERSION_BIP_0037: u32 = 70001;

/// First protocol version with timestamps in `addr` network addresses.
pub const VERSION_TIME_IN_NETADDR: u32 = 31402;

/// User agent advertised in outbound `version` messages.
pub const USER_AGENT: &str = "/crawler-rust/0.1/";
