//! Textual peer endpoints.

use crate::{ProtocolError, ProtocolResult};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// A `(host, port)` pair identifying a TCP peer.
///
/// Both fields stay textual through the pipeline: endpoints are read
/// back from the store, where a corrupt row may hold a port that no
/// longer parses as an integer. Such peers are treated as unreachable
/// at dial time rather than aborting the crawl.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host, usually an IPv4/IPv6 literal.
    pub ip: String,
    /// Port, decimal text.
    pub port: String,
}

impl Endpoint {
    /// Create an endpoint from raw parts.
    pub fn new(ip: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port: port.into(),
        }
    }

    /// Parse a `host:port` string, accepting the square-bracketed IPv6
    /// convention (`[::1]:8333`). The host must be non-empty and the
    /// port a valid 16-bit integer.
    pub fn from_host_port(s: &str) -> ProtocolResult<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ProtocolError::InvalidEndpoint(format!("missing port in {s:?}")))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(ProtocolError::InvalidEndpoint(format!(
                "empty host in {s:?}"
            )));
        }
        if port.parse::<u16>().is_err() {
            return Err(ProtocolError::InvalidEndpoint(format!(
                "invalid port in {s:?}"
            )));
        }

        Ok(Self::new(host, port))
    }

    /// The port as a 16-bit integer, if it parses.
    pub fn port_number(&self) -> Option<u16> {
        self.port.parse().ok()
    }

    /// The endpoint as a socket address, if both fields parse.
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        let ip: IpAddr = self.ip.parse().ok()?;
        Some(SocketAddr::new(ip, self.port_number()?))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{}", self.ip, self.port)
        } else {
            write!(f, "{}:{}", self.ip, self.port)
        }
    }
}
