//! # crawler-network
//!
//! TCP transport and per-peer crawl driver.
//!
//! This crate provides:
//! - [`Connection`]: a framed TCP connection with dial, read and write
//!   deadlines
//! - [`crawl_peer`]: the per-peer conversation (handshake, repeated
//!   `getaddr`, collect `addr` replies) producing a
//!   [`crawler_protocol::CrawlResult`]

mod connection;
mod crawl;
mod error;

pub use connection::{Connection, ConnectionConfig};
pub use crawl::crawl_peer;
pub use error::{NetworkError, NetworkResult};

/// Number of `getaddr` rounds before a peer is considered drained.
pub const GETADDR_ROUNDS: u32 = 4;

/// An `addr` batch below this size ends the current `getaddr` round.
pub const ADDR_BATCH_FULL: usize = 1000;
