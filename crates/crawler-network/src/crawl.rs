//! Per-peer crawl driver.

use crate::{Connection, NetworkError, NetworkResult, ADDR_BATCH_FULL, GETADDR_ROUNDS};
use crawler_protocol::{build_version, parse_addr, Command, CrawlResult, Endpoint, Message, Version};
use tracing::debug;

/// Run the crawl conversation against a freshly dialed peer.
///
/// Sends our `version`, expects the peer's `version` and `verack`,
/// then issues `getaddr` rounds, collecting `addr` batches until
/// [`GETADDR_ROUNDS`] short batches have been seen. A batch shorter
/// than [`ADDR_BATCH_FULL`] is what ends a round; a peer that keeps
/// returning full batches holds the conversation open until the read
/// deadline ends it.
///
/// Any failure terminates the conversation, keeping whatever was
/// gathered up to that point: a peer that sent its `version` counts as
/// identified even if the `verack` never followed. The connection is
/// always closed on exit.
pub async fn crawl_peer(endpoint: Endpoint, mut conn: Connection) -> CrawlResult {
    let mut result = CrawlResult {
        endpoint,
        online: true,
        version: None,
        addresses: Vec::new(),
    };

    if let Err(e) = drive(&mut conn, &mut result).await {
        debug!(peer = %result.endpoint, error = %e, "crawl ended early");
    }

    let _ = conn.close().await;
    result
}

/// The DIALED -> HANDSHAKING -> ENUMERATING -> DONE sequence, writing
/// progress into `result` as it happens.
async fn drive(conn: &mut Connection, result: &mut CrawlResult) -> NetworkResult<()> {
    let (remote, local) = match (conn.peer_addr(), conn.local_addr()) {
        (Ok(remote), Ok(local)) => (remote, local),
        _ => {
            result.online = false;
            return Err(NetworkError::ConnectionClosed);
        }
    };

    if let Err(e) = conn.send(build_version(remote, local)).await {
        // Typically a firewall accepting the SYN and dropping the rest.
        result.online = false;
        return Err(e);
    }

    let msg = conn.receive().await?;
    if msg.command != Command::Version {
        return Err(NetworkError::UnexpectedMessage {
            expected: "version",
            got: msg.command.to_string(),
        });
    }
    result.version = Some(Version::parse(&msg.payload)?);

    let msg = conn.receive().await?;
    if msg.command != Command::Verack {
        return Err(NetworkError::UnexpectedMessage {
            expected: "verack",
            got: msg.command.to_string(),
        });
    }

    conn.send(Message::getaddr()).await?;
    let mut rounds = 1;

    while rounds < GETADDR_ROUNDS {
        let msg = conn.receive().await?;

        match msg.command {
            Command::Addr => {
                let batch = parse_addr(&msg.payload)?;
                let short = batch.len() < ADDR_BATCH_FULL;
                result.addresses.extend(batch);

                // A short batch means the peer has nothing more to give
                // for this round.
                if short {
                    rounds += 1;
                    if rounds == GETADDR_ROUNDS {
                        break;
                    }
                    conn.send(Message::getaddr()).await?;
                }
            }
            other => debug!(command = %other, "ignoring message"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionConfig;
    use bytes::BytesMut;
    use crawler_protocol::{
        write_var_int, MessageCodec, NetAddr, PROTOCOL_VERSION, TESTNET3_MAGIC,
    };
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_util::codec::{Decoder, Encoder};

    fn frame(msg: Message) -> Vec<u8> {
        let mut codec = MessageCodec::new(TESTNET3_MAGIC);
        let mut buf = BytesMut::new();
        codec.encode(msg, &mut buf).unwrap();
        buf.to_vec()
    }

    fn version_msg() -> Message {
        let remote: SocketAddr = "127.0.0.1:1024".parse().unwrap();
        let local: SocketAddr = "127.0.0.1:1025".parse().unwrap();
        build_version(remote, local)
    }

    fn addr_batch(count: usize, base: u8) -> Message {
        let mut payload = Vec::new();
        write_var_int(&mut payload, count as u64);
        for i in 0..count {
            let addr = NetAddr {
                timestamp: Some(1_700_000_000),
                services: 1,
                ip: IpAddr::V4(Ipv4Addr::new(base, (i >> 8) as u8, i as u8, 1)),
                port: 8333,
            };
            addr.write(&mut payload, true);
        }
        Message::new(Command::Addr, payload)
    }

    /// Spawn a scripted peer: it writes the given frames up front, then
    /// reads everything the client sends until the client closes, and
    /// returns the decoded client commands.
    async fn stub_peer(script: Vec<Message>) -> (SocketAddr, JoinHandle<Vec<Command>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();

            for msg in script {
                sock.write_all(&frame(msg)).await.unwrap();
            }

            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match sock.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                }
            }

            let mut codec = MessageCodec::new(TESTNET3_MAGIC);
            let mut bytes = BytesMut::from(received.as_slice());
            let mut commands = Vec::new();
            while let Ok(Some(msg)) = codec.decode(&mut bytes) {
                commands.push(msg.command);
            }
            commands
        });

        (addr, handle)
    }

    async fn crawl_stub(script: Vec<Message>) -> (CrawlResult, Vec<Command>) {
        crawl_stub_with(script, ConnectionConfig::default()).await
    }

    async fn crawl_stub_with(
        script: Vec<Message>,
        config: ConnectionConfig,
    ) -> (CrawlResult, Vec<Command>) {
        let (addr, handle) = stub_peer(script).await;

        let conn = Connection::connect(&addr.ip().to_string(), addr.port(), TESTNET3_MAGIC, config)
            .await
            .unwrap();

        let endpoint = Endpoint::new(addr.ip().to_string(), addr.port().to_string());
        let result = crawl_peer(endpoint, conn).await;
        let commands = handle.await.unwrap();
        (result, commands)
    }

    #[tokio::test]
    async fn test_handshake_then_short_addr() {
        let script = vec![
            version_msg(),
            Message::verack(),
            addr_batch(3, 10),
            addr_batch(0, 0),
            addr_batch(0, 0),
        ];

        let (result, commands) = crawl_stub(script).await;

        assert!(result.online);
        assert!(result.success());
        assert_eq!(result.version.as_ref().unwrap().protocol, PROTOCOL_VERSION);
        assert_eq!(result.addresses.len(), 3);

        // One version, then the initial getaddr plus one per short batch
        // until the rounds ran out.
        assert_eq!(
            commands,
            vec![
                Command::Version,
                Command::GetAddr,
                Command::GetAddr,
                Command::GetAddr,
            ]
        );
    }

    #[tokio::test]
    async fn test_multi_round_addr() {
        let script = vec![
            version_msg(),
            Message::verack(),
            addr_batch(1000, 1),
            addr_batch(1000, 2),
            addr_batch(500, 3),
            addr_batch(0, 0),
            addr_batch(0, 0),
        ];

        let (result, commands) = crawl_stub(script).await;

        assert_eq!(result.addresses.len(), 2500);

        // Full batches do not advance the round: the 500 batch ends
        // round one, the empty batches end rounds two and three, so
        // exactly two additional getaddr requests go out.
        let getaddrs = commands.iter().filter(|c| **c == Command::GetAddr).count();
        assert_eq!(getaddrs, 3);
    }

    #[tokio::test]
    async fn test_unexpected_first_message() {
        let (result, _) = crawl_stub(vec![Message::verack()]).await;

        assert!(result.online);
        assert!(!result.success());
        assert!(result.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_version_kept_without_verack() {
        let script = vec![version_msg(), Message::getaddr()];

        let (result, _) = crawl_stub(script).await;

        assert!(result.online);
        assert!(result.success());
        assert!(result.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_ignores_unknown_messages() {
        let script = vec![
            version_msg(),
            Message::verack(),
            Message::new(Command::Other("ping".to_string()), vec![0u8; 8]),
            addr_batch(2, 20),
            addr_batch(0, 0),
            addr_batch(0, 0),
        ];

        let (result, _) = crawl_stub(script).await;

        assert_eq!(result.addresses.len(), 2);
    }

    #[tokio::test]
    async fn test_silent_peer_keeps_partial_addresses() {
        // The peer goes quiet after one short batch; the read deadline
        // ends the conversation and the collected addresses survive.
        let script = vec![version_msg(), Message::verack(), addr_batch(5, 30)];

        let config = ConnectionConfig {
            read_timeout: std::time::Duration::from_millis(200),
            ..ConnectionConfig::default()
        };
        let (result, _) = crawl_stub_with(script, config).await;

        assert!(result.online);
        assert!(result.success());
        assert_eq!(result.addresses.len(), 5);
    }
}
