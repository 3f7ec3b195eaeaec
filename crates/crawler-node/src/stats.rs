//! Periodic crawl statistics.
//!
//! Stages feed cheap named counters through a dedicated channel; a
//! background task accumulates them and logs one summary line per
//! interval. Sends never block the pipeline: when the buffer is full
//! the sample is dropped.

use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

const STAT_BUFFER: usize = 200;

#[derive(Debug)]
struct Stat {
    name: &'static str,
    value: u64,
}

/// Handle for incrementing counters from any stage.
#[derive(Clone)]
pub struct StatSink {
    tx: mpsc::Sender<Stat>,
}

impl StatSink {
    /// Add `value` to the named counter.
    pub fn add(&self, name: &'static str, value: u64) {
        let _ = self.tx.try_send(Stat { name, value });
    }
}

/// Spawn the collector task. It runs until every [`StatSink`] clone
/// has been dropped.
pub fn spawn(period: Duration) -> StatSink {
    let (tx, mut rx) = mpsc::channel::<Stat>(STAT_BUFFER);

    tokio::spawn(async move {
        let mut totals: BTreeMap<&'static str, u64> = BTreeMap::new();
        let mut last: BTreeMap<&'static str, u64> = BTreeMap::new();
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await; // the first tick fires immediately

        loop {
            tokio::select! {
                stat = rx.recv() => match stat {
                    Some(stat) => *totals.entry(stat.name).or_insert(0) += stat.value,
                    None => break,
                },
                _ = ticker.tick() => {
                    if totals.is_empty() {
                        continue;
                    }
                    info!("{}", render(&totals, &last));
                    last = totals.clone();
                }
            }
        }
    });

    StatSink { tx }
}

/// One summary line: running totals with the delta since last print.
fn render(totals: &BTreeMap<&'static str, u64>, last: &BTreeMap<&'static str, u64>) -> String {
    totals
        .iter()
        .map(|(name, total)| {
            let delta = total - last.get(name).copied().unwrap_or(0);
            format!("{name}: {total} (+{delta})")
        })
        .collect::<Vec<_>>()
        .join("  ")
}
