//! Pipeline supervisor.
//!
//! Wires the four stages together:
//!
//! ```text
//! address source -> [endpoints] -> connector pool -> [dialed peers]
//!     -> updater pool -> [save queue] -> writer
//! ```
//!
//! Every queue is bounded, so back-pressure propagates upstream from
//! the writer. Shutdown is close-on-drain: when the endpoint queue
//! closes (the `--connect` mode), each stage finishes its remaining
//! work and closes its own output.

use crate::config::CrawlerConfig;
use crate::source::ADDRESSES_NUM;
use crate::{connector, source, stats, updater, writer};
use anyhow::{Context, Result};
use crawler_storage::{Pool, NUM_DB_CONN};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Capacity of the dialed-peer and save queues.
pub const NODE_BUFFER_SIZE: usize = 20;

/// Interval between statistics lines.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Run the crawler until its address source is exhausted or a fatal
/// error occurs. In normal operation the source never exhausts; in
/// `--connect` mode the pipeline drains after the single peer.
pub async fn run(config: CrawlerConfig) -> Result<()> {
    let pool =
        Arc::new(Pool::open(&config.db_path, NUM_DB_CONN).context("opening the peer store")?);

    let (endpoint_tx, endpoint_rx) = mpsc::channel(2 * ADDRESSES_NUM);
    let (dialed_tx, dialed_rx) = mpsc::channel(NODE_BUFFER_SIZE);
    let (save_tx, save_rx) = mpsc::channel(NODE_BUFFER_SIZE);

    let stats = stats::spawn(STATS_INTERVAL);
    let magic = config.network.magic();

    let source: JoinHandle<Result<()>> = match config.connect {
        Some(endpoint) => {
            info!(peer = %endpoint, "connecting to a single peer");
            let _ = endpoint_tx.send(endpoint).await;
            drop(endpoint_tx);
            tokio::spawn(async { Ok::<(), anyhow::Error>(()) })
        }
        None => tokio::spawn(source::run(pool.clone(), config.bootstrap, endpoint_tx)),
    };

    let connector = tokio::spawn(connector::run(endpoint_rx, dialed_tx, magic));
    let updater = tokio::spawn(updater::run(dialed_rx, save_tx, stats.clone()));
    let writer = tokio::spawn(writer::run(save_rx, pool.clone(), stats));

    tokio::try_join!(
        flatten(source),
        flatten(connector),
        flatten(updater),
        flatten(writer),
    )?;

    pool.close().await;
    Ok(())
}

async fn flatten(handle: JoinHandle<Result<()>>) -> Result<()> {
    handle.await.context("pipeline task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crawler_protocol::Endpoint;
    use tempfile::TempDir;

    fn connect_config(dir: &TempDir, endpoint: Endpoint) -> CrawlerConfig {
        CrawlerConfig {
            network: Network::Testnet3,
            db_path: dir.path().join("crawler.db"),
            bootstrap: None,
            connect: Some(endpoint),
        }
    }

    #[tokio::test]
    async fn test_connect_mode_records_unreachable_peer_and_exits() {
        let dir = TempDir::new().unwrap();
        let config = connect_config(&dir, Endpoint::new("127.0.0.1", "1"));

        run(config).await.unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("crawler.db")).unwrap();
        let (online, success, next_refresh): (bool, bool, i64) = conn
            .query_row(
                "SELECT online, success, next_refresh FROM nodes WHERE ip = '127.0.0.1' AND port = '1'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();

        assert!(!online);
        assert!(!success);
        assert_eq!(next_refresh, 0);
    }

    #[tokio::test]
    async fn test_connect_mode_tolerates_corrupt_port() {
        let dir = TempDir::new().unwrap();
        let config = connect_config(&dir, Endpoint::new("127.0.0.1", "notaport"));

        run(config).await.unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("crawler.db")).unwrap();
        let online: bool = conn
            .query_row(
                "SELECT online FROM nodes WHERE ip = '127.0.0.1'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!(!online);
    }
}
