//! Network addresses as carried in `version` and `addr` payloads.

use crate::{read_var_int, Endpoint, ProtocolError, ProtocolResult};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

/// Size of a network address without the leading timestamp.
pub const NETADDR_SIZE: usize = 26;

/// Size of a network address with the leading timestamp.
pub const NETADDR_SIZE_WITH_TIME: usize = 30;

/// A peer address on the wire.
///
/// Layout (offsets with/without the time field):
///
/// ```text
/// time      0.. 3          u32      last-seen timestamp
/// services  4..11   0.. 7  u64      service flags
/// ip       12..27   8..23  [16]u8   IPv6 layout, IPv4 v4-mapped
/// port     28..29  24..25  u16      big-endian
/// ```
///
/// The timestamp is only present in `addr` payloads on protocol
/// versions >= [`crate::VERSION_TIME_IN_NETADDR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetAddr {
    /// Last-seen UNIX timestamp, when the encoding carries one.
    pub timestamp: Option<u32>,
    /// Service flags bitfield.
    pub services: u64,
    /// Peer IP address.
    pub ip: IpAddr,
    /// Peer port.
    pub port: u16,
}

impl NetAddr {
    /// The address as a pipeline endpoint.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.ip.to_string(), self.port.to_string())
    }

    /// Parse a network address from a slice holding exactly one
    /// address, with or without the leading timestamp.
    pub fn parse(data: &[u8], with_time: bool) -> ProtocolResult<Self> {
        let expected = if with_time {
            NETADDR_SIZE_WITH_TIME
        } else {
            NETADDR_SIZE
        };
        if data.len() != expected {
            return Err(ProtocolError::InvalidPayload(format!(
                "netaddr: unexpected size {} (want {})",
                data.len(),
                expected
            )));
        }

        let (timestamp, data) = if with_time {
            let ts = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            (Some(ts), &data[4..])
        } else {
            (None, data)
        };

        let mut services = [0u8; 8];
        services.copy_from_slice(&data[0..8]);

        let mut ip = [0u8; 16];
        ip.copy_from_slice(&data[8..24]);

        Ok(Self {
            timestamp,
            services: u64::from_le_bytes(services),
            ip: ip_from_wire(ip),
            port: u16::from_be_bytes([data[24], data[25]]),
        })
    }

    /// Append the wire encoding of this address to `buf`.
    ///
    /// The timestamp is written only when `with_time` is set; an absent
    /// timestamp encodes as zero.
    pub fn write(&self, buf: &mut Vec<u8>, with_time: bool) {
        if with_time {
            buf.extend_from_slice(&self.timestamp.unwrap_or(0).to_le_bytes());
        }
        buf.extend_from_slice(&self.services.to_le_bytes());
        buf.extend_from_slice(&ip_to_wire(self.ip));
        buf.extend_from_slice(&self.port.to_be_bytes());
    }
}

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

/// Parse an `addr` payload: a varint count followed by that many
/// timestamped network addresses. The count is bounded by the payload
/// size.
pub fn parse_addr(payload: &[u8]) -> ProtocolResult<Vec<NetAddr>> {
    let (count, n) = read_var_int(payload)?;

    // Size the batch in u64: a hostile count must not wrap the bounds
    // check and reach the indexing below.
    let needed = count
        .checked_mul(NETADDR_SIZE_WITH_TIME as u64)
        .and_then(|total| total.checked_add(n as u64))
        .filter(|&total| total <= payload.len() as u64);
    if needed.is_none() {
        return Err(ProtocolError::InvalidPayload(format!(
            "addr: payload of {} bytes is too small for {} addresses",
            payload.len(),
            count
        )));
    }
    let count = count as usize;

    let mut addresses = Vec::with_capacity(count);
    for i in 0..count {
        let start = n + i * NETADDR_SIZE_WITH_TIME;
        let end = start + NETADDR_SIZE_WITH_TIME;
        addresses.push(NetAddr::parse(&payload[start..end], true)?);
    }

    Ok(addresses)
}

/// The 16-byte wire form of an IP address; IPv4 is v4-mapped.
fn ip_to_wire(ip: IpAddr) -> [u8; 16] {
    match ip {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

/// Decode the 16-byte wire form, rendering v4-mapped addresses back as
/// IPv4 so their textual form matches what peers report elsewhere.
fn ip_from_wire(octets: [u8; 16]) -> IpAddr {
    let v6 = Ipv6Addr::from(octets);
    match v6.to_ipv4_mapped() {
        Some(v4) => IpAddr::V4(v4),
        None => IpAddr::V6(v6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write_var_int;
    use std::net::Ipv4Addr;

    fn sample(ip: IpAddr, port: u16, timestamp: Option<u32>) -> NetAddr {
        NetAddr {
            timestamp,
            services: 1,
            ip,
            port,
        }
    }

    #[test]
    fn test_roundtrip_without_time() {
        let addr = sample(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 8333, None);

        let mut buf = Vec::new();
        addr.write(&mut buf, false);
        assert_eq!(buf.len(), NETADDR_SIZE);

        let parsed = NetAddr::parse(&buf, false).unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_roundtrip_with_time() {
        let addr = sample("2001:db8::1".parse().unwrap(), 18333, Some(1_700_000_000));

        let mut buf = Vec::new();
        addr.write(&mut buf, true);
        assert_eq!(buf.len(), NETADDR_SIZE_WITH_TIME);

        let parsed = NetAddr::parse(&buf, true).unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_ipv4_is_v4_mapped_on_the_wire() {
        let addr = sample(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), 0, None);

        let mut buf = Vec::new();
        addr.write(&mut buf, false);

        // services (8) then 10 zero bytes, 0xffff, then the quad
        assert_eq!(&buf[8..18], &[0u8; 10]);
        assert_eq!(&buf[18..20], &[0xFF, 0xFF]);
        assert_eq!(&buf[20..24], &[1, 2, 3, 4]);

        let parsed = NetAddr::parse(&buf, false).unwrap();
        assert_eq!(parsed.ip.to_string(), "1.2.3.4");
    }

    #[test]
    fn test_wrong_size_rejected() {
        assert!(NetAddr::parse(&[0u8; 25], false).is_err());
        assert!(NetAddr::parse(&[0u8; 26], true).is_err());
    }

    #[test]
    fn test_parse_addr_payload() {
        let addrs = vec![
            sample(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 8333, Some(100)),
            sample(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 8333, Some(200)),
            sample("::1".parse().unwrap(), 18333, Some(300)),
        ];

        let mut payload = Vec::new();
        write_var_int(&mut payload, addrs.len() as u64);
        for a in &addrs {
            a.write(&mut payload, true);
        }

        let parsed = parse_addr(&payload).unwrap();
        assert_eq!(parsed, addrs);
    }

    #[test]
    fn test_parse_addr_count_exceeds_payload() {
        let mut payload = Vec::new();
        write_var_int(&mut payload, 10);
        payload.extend_from_slice(&[0u8; NETADDR_SIZE_WITH_TIME]);

        assert!(parse_addr(&payload).is_err());
    }

    #[test]
    fn test_parse_addr_huge_count_rejected() {
        // Counts whose size math would wrap must be rejected, not
        // indexed.
        for count in [u64::MAX, u64::MAX / NETADDR_SIZE_WITH_TIME as u64] {
            let mut payload = Vec::new();
            write_var_int(&mut payload, count);
            payload.extend_from_slice(&[0u8; NETADDR_SIZE_WITH_TIME]);

            assert!(parse_addr(&payload).is_err());
        }
    }
}
