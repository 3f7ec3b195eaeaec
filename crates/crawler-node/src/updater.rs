//! Update stage: run the crawl conversation against dialed peers.

use crate::connector::DialedPeer;
use crate::stats::StatSink;
use anyhow::Result;
use crawler_network::crawl_peer;
use crawler_protocol::CrawlResult;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Number of concurrent crawl conversations.
pub const NUM_UPDATE_WORKERS: usize = 4;

/// Fan dialed peers out over [`NUM_UPDATE_WORKERS`] crawl workers.
/// Unreachable peers pass straight through. Closes the save queue when
/// the upstream drains.
pub async fn run(
    rx: mpsc::Receiver<DialedPeer>,
    tx: mpsc::Sender<CrawlResult>,
    stats: StatSink,
) -> Result<()> {
    let rx = Arc::new(Mutex::new(rx));

    let mut workers = Vec::with_capacity(NUM_UPDATE_WORKERS);
    for _ in 0..NUM_UPDATE_WORKERS {
        workers.push(tokio::spawn(worker(rx.clone(), tx.clone(), stats.clone())));
    }
    drop(tx);

    for handle in workers {
        let _ = handle.await;
    }
    Ok(())
}

async fn worker(
    rx: Arc<Mutex<mpsc::Receiver<DialedPeer>>>,
    tx: mpsc::Sender<CrawlResult>,
    stats: StatSink,
) {
    loop {
        let peer = rx.lock().await.recv().await;
        let Some(peer) = peer else {
            return;
        };

        let result = match peer.conn {
            Some(conn) => {
                let result = crawl_peer(peer.endpoint, conn).await;
                stats.add("refresh", 1);
                stats.add("addresses", result.addresses.len() as u64);
                result
            }
            None => {
                stats.add("skip", 1);
                CrawlResult::offline(peer.endpoint)
            }
        };

        if tx.send(result).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;
    use crawler_protocol::Endpoint;
    use std::time::Duration;

    #[tokio::test]
    async fn test_null_socket_passes_through() {
        let (peer_tx, peer_rx) = mpsc::channel(4);
        let (result_tx, mut result_rx) = mpsc::channel(4);
        let sink = stats::spawn(Duration::from_secs(3600));

        peer_tx
            .send(DialedPeer {
                endpoint: Endpoint::new("10.0.0.1", "8333"),
                conn: None,
            })
            .await
            .unwrap();
        drop(peer_tx);

        run(peer_rx, result_tx, sink).await.unwrap();

        let result = result_rx.recv().await.unwrap();
        assert!(!result.online);
        assert!(!result.success());
        assert!(result_rx.recv().await.is_none());
    }
}
