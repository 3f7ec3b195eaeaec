//! Address source: feed the dial queue from the store.

use anyhow::{bail, Result};
use crawler_protocol::Endpoint;
use crawler_storage::{addresses_to_update, have_known_nodes, unix_now, Pool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::info;

/// Maximum endpoints fetched from the store per iteration.
pub const ADDRESSES_NUM: usize = 5000;

/// Pause between fetch iterations.
pub const ADDRESSES_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How long the bootstrap connection gets to land before the store is
/// asked for more work.
const BOOTSTRAP_SETTLE: Duration = Duration::from_secs(60);

/// Periodically emit endpoints whose refresh deadline has elapsed.
///
/// On a store with no successfully crawled peer yet, exactly one
/// configured bootstrap endpoint is emitted first; without one,
/// startup fails. Fetching skips a turn while the queue is still at
/// least half full.
pub async fn run(
    pool: Arc<Pool>,
    bootstrap: Option<Endpoint>,
    tx: mpsc::Sender<Endpoint>,
) -> Result<()> {
    if !pool.with_conn(|conn| have_known_nodes(conn)).await? {
        let Some(seed) = bootstrap else {
            bail!("no known nodes in store and no bootstrap address provided");
        };

        info!(peer = %seed, "bootstrapping");
        if tx.send(seed).await.is_err() {
            return Ok(());
        }

        sleep(BOOTSTRAP_SETTLE).await;
    }

    loop {
        let queued = tx.max_capacity() - tx.capacity();
        info!(queued, "addresses in queue");

        if queued < ADDRESSES_NUM / 2 {
            let now = unix_now();
            let (endpoints, eligible) = pool
                .with_conn(move |conn| addresses_to_update(conn, ADDRESSES_NUM, now))
                .await?;

            info!(adding = endpoints.len(), eligible, "adding addresses");

            for endpoint in endpoints {
                if tx.send(endpoint).await.is_err() {
                    return Ok(());
                }
            }
        }

        sleep(ADDRESSES_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_storage::NUM_DB_CONN;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_store_without_bootstrap_fails() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(Pool::open(&dir.path().join("crawler.db"), NUM_DB_CONN).unwrap());
        let (tx, _rx) = mpsc::channel(16);

        let result = run(pool, None, tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_emitted_on_empty_store() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(Pool::open(&dir.path().join("crawler.db"), NUM_DB_CONN).unwrap());
        let (tx, mut rx) = mpsc::channel(16);

        let seed = Endpoint::new("203.0.113.7", "18333");
        let source = tokio::spawn(run(pool, Some(seed.clone()), tx));

        let first = rx.recv().await.unwrap();
        assert_eq!(first, seed);

        // The source then settles into its endless loop.
        source.abort();
    }
}
