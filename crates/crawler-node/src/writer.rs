//! Save stage: apply crawl results to the store.

use crate::stats::StatSink;
use anyhow::{Context, Result};
use crawler_protocol::CrawlResult;
use crawler_storage::{save_result, unix_now, Pool};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Single-threaded writer: one transaction per crawl result, on a
/// pooled connection held only for that transaction. Store errors are
/// fatal.
pub async fn run(
    mut rx: mpsc::Receiver<CrawlResult>,
    pool: Arc<Pool>,
    stats: StatSink,
) -> Result<()> {
    while let Some(result) = rx.recv().await {
        stats.add("save", 1);

        if let Some(version) = &result.version {
            if !version.user_agent.is_empty() || !result.addresses.is_empty() {
                info!(
                    peer = %result.endpoint,
                    user_agent = %version.user_agent,
                    peers = result.addresses.len(),
                    "crawled peer"
                );
            }
        }

        let now = unix_now();
        pool.with_conn(move |conn| save_result(conn, &result, now))
            .await
            .context("saving crawl result")?;
    }
    Ok(())
}
