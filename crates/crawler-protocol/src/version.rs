//! The `version` payload grammar.

use crate::{
    read_var_str, write_var_str, Command, Message, NetAddr, ProtocolError, ProtocolResult,
    NETADDR_SIZE, PROTOCOL_VERSION, USER_AGENT, VERSION_BIP_0037,
};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Smallest payload that can hold everything up to and including the
/// first byte of the user-agent varstr.
const MIN_VERSION_SIZE: usize = 81;

/// A decoded `version` payload.
///
/// Layout:
///
/// ```text
/// protocol        0.. 3    u32
/// services        4..11    u64
/// timestamp      12..19    u64
/// addr_recv      20..45    netaddr, no timestamp
/// addr_from      46..71    netaddr, no timestamp
/// nonce          72..79    u64
/// user_agent     80..??    varstr
/// start_height  ??+1..??+4 i32
/// relay         ??+5       u8, present when protocol >= 70001
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Protocol version spoken by the peer.
    pub protocol: u32,
    /// Services advertised by the peer.
    pub services: u64,
    /// Peer's UNIX timestamp.
    pub timestamp: i64,
    /// Address of the receiving side, as seen by the sender.
    pub addr_recv: NetAddr,
    /// Address of the sending side.
    pub addr_from: NetAddr,
    /// Random nonce for self-connection detection.
    pub nonce: u64,
    /// Peer user agent.
    pub user_agent: String,
    /// Peer's best block height.
    pub start_height: i32,
    /// Whether the peer wants transaction relay.
    pub relay: bool,
}

impl Version {
    /// Parse a `version` payload.
    pub fn parse(payload: &[u8]) -> ProtocolResult<Self> {
        if payload.len() < MIN_VERSION_SIZE {
            return Err(ProtocolError::InvalidPayload(format!(
                "version: payload too small ({})",
                payload.len()
            )));
        }

        let protocol = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);

        let mut u64buf = [0u8; 8];
        u64buf.copy_from_slice(&payload[4..12]);
        let services = u64::from_le_bytes(u64buf);

        u64buf.copy_from_slice(&payload[12..20]);
        let timestamp = u64::from_le_bytes(u64buf) as i64;

        let addr_recv = NetAddr::parse(&payload[20..20 + NETADDR_SIZE], false)?;
        let addr_from = NetAddr::parse(&payload[46..46 + NETADDR_SIZE], false)?;

        u64buf.copy_from_slice(&payload[72..80]);
        let nonce = u64::from_le_bytes(u64buf);

        let (user_agent, n) = read_var_str(&payload[80..])?;

        let rest = &payload[80 + n..];
        if rest.len() < 4 {
            return Err(ProtocolError::InvalidPayload(format!(
                "version: payload too small ({}) for start_height",
                payload.len()
            )));
        }
        let start_height = i32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);

        let relay = protocol >= VERSION_BIP_0037 && rest.len() == 5 && rest[4] != 0;

        Ok(Self {
            protocol,
            services,
            timestamp,
            addr_recv,
            addr_from,
            nonce,
            user_agent,
            start_height,
            relay,
        })
    }
}

/// Build the outbound `version` message for a freshly dialed socket.
///
/// The receiving address is the socket's remote end, the sending
/// address its local end with the port zeroed. Services, start-height
/// and relay are all zero; the nonce is random but not security
/// sensitive.
pub fn build_version(remote: SocketAddr, local: SocketAddr) -> Message {
    let mut payload = Vec::with_capacity(MIN_VERSION_SIZE + USER_AGENT.len() + 5);

    payload.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
    payload.extend_from_slice(&0u64.to_le_bytes()); // services

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    payload.extend_from_slice(&now.to_le_bytes());

    let addr_recv = NetAddr {
        timestamp: None,
        services: 1,
        ip: remote.ip(),
        port: remote.port(),
    };
    addr_recv.write(&mut payload, false);

    let addr_from = NetAddr {
        timestamp: None,
        services: 0,
        ip: local.ip(),
        port: 0,
    };
    addr_from.write(&mut payload, false);

    payload.extend_from_slice(&rand::random::<u64>().to_le_bytes());

    write_var_str(&mut payload, USER_AGENT);

    payload.extend_from_slice(&0i32.to_le_bytes()); // start_height
    payload.push(0); // relay

    Message::new(Command::Version, payload)
}
