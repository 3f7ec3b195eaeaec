//! Dial stage: turn endpoints into connected (or unreachable) peers.

use anyhow::Result;
use crawler_network::{Connection, ConnectionConfig};
use crawler_protocol::Endpoint;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

/// Number of concurrent dial attempts.
pub const NUM_CONNECTION_WORKERS: usize = 20;

/// An endpoint after the dial attempt. `conn` is `None` when the peer
/// was unreachable; the record is still forwarded so the writer can
/// mark it offline.
pub struct DialedPeer {
    pub endpoint: Endpoint,
    pub conn: Option<Connection>,
}

/// Consume endpoints and emit dialed peers, at most
/// [`NUM_CONNECTION_WORKERS`] dials in flight. Closes the downstream
/// queue once the endpoint queue is drained and every dial finished.
pub async fn run(
    mut rx: mpsc::Receiver<Endpoint>,
    tx: mpsc::Sender<DialedPeer>,
    magic: [u8; 4],
) -> Result<()> {
    let limiter = Arc::new(Semaphore::new(NUM_CONNECTION_WORKERS));

    while let Some(endpoint) = rx.recv().await {
        let Ok(permit) = limiter.clone().acquire_owned().await else {
            break;
        };

        let tx = tx.clone();
        tokio::spawn(async move {
            let peer = dial(endpoint, magic).await;
            let _ = tx.send(peer).await;
            drop(permit);
        });
    }

    // Wait for in-flight dials before letting the downstream close.
    let _ = limiter.acquire_many(NUM_CONNECTION_WORKERS as u32).await;
    Ok(())
}

async fn dial(endpoint: Endpoint, magic: [u8; 4]) -> DialedPeer {
    let Some(port) = endpoint.port_number() else {
        warn!(peer = %endpoint, "port is not a valid integer");
        return DialedPeer {
            endpoint,
            conn: None,
        };
    };

    let conn = match Connection::connect(&endpoint.ip, port, magic, ConnectionConfig::default())
        .await
    {
        Ok(conn) => Some(conn),
        Err(e) => {
            debug!(peer = %endpoint, error = %e, "dial failed");
            None
        }
    };

    DialedPeer { endpoint, conn }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_protocol::TESTNET3_MAGIC;

    #[tokio::test]
    async fn test_unreachable_endpoint_forwarded_offline() {
        let (endpoint_tx, endpoint_rx) = mpsc::channel(4);
        let (dialed_tx, mut dialed_rx) = mpsc::channel(4);

        endpoint_tx
            .send(Endpoint::new("127.0.0.1", "1"))
            .await
            .unwrap();
        drop(endpoint_tx);

        run(endpoint_rx, dialed_tx, TESTNET3_MAGIC).await.unwrap();

        let peer = dialed_rx.recv().await.unwrap();
        assert_eq!(peer.endpoint.ip, "127.0.0.1");
        assert!(peer.conn.is_none());
        assert!(dialed_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_bad_port_forwarded_offline() {
        let (endpoint_tx, endpoint_rx) = mpsc::channel(4);
        let (dialed_tx, mut dialed_rx) = mpsc::channel(4);

        endpoint_tx
            .send(Endpoint::new("127.0.0.1", "notaport"))
            .await
            .unwrap();
        drop(endpoint_tx);

        run(endpoint_rx, dialed_tx, TESTNET3_MAGIC).await.unwrap();

        let peer = dialed_rx.recv().await.unwrap();
        assert!(peer.conn.is_none());
    }
}
