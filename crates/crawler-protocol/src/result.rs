//! Crawl outcomes.

use crate::{Endpoint, NetAddr, Version};

/// Everything learned about one endpoint during a single crawl.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The endpoint that was crawled.
    pub endpoint: Endpoint,
    /// Whether TCP connect (and the initial write) succeeded.
    pub online: bool,
    /// The peer's decoded `version`, when one was received.
    pub version: Option<Version>,
    /// Addresses learned from `addr` replies.
    pub addresses: Vec<NetAddr>,
}

impl CrawlResult {
    /// Result for a peer that could not be reached at all.
    pub fn offline(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            online: false,
            version: None,
            addresses: Vec::new(),
        }
    }

    /// Whether the handshake got far enough to identify the peer.
    pub fn success(&self) -> bool {
        self.version.is_some()
    }
}
