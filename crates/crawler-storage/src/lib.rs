//! # crawler-storage
//!
//! SQLite-backed peer store for the network crawler.
//!
//! This crate provides:
//! - [`Pool`]: a fixed set of pooled connections handed out through a
//!   bounded channel, with WAL journaling so address-source reads do
//!   not block the writer
//! - idempotent schema setup for the `nodes` and `nodes_known` tables
//! - the read queries feeding the address source
//! - [`save_result`]: the transactional reconciliation of one crawl
//!   result with the stored peer state and the knows-relation
//!
//! All timestamps are UNIX epoch seconds stored in numeric columns.

mod error;
mod pool;
mod queries;
mod save;
mod schema;

pub use error::{StoreError, StoreResult};
pub use pool::Pool;
pub use queries::{addresses_to_update, have_known_nodes};
pub use save::{save_result, NodeId};
pub use schema::setup;

use std::time::{SystemTime, UNIX_EPOCH};

/// Number of pooled store connections.
pub const NUM_DB_CONN: usize = 10;

/// How far ahead a reachable peer's next refresh is scheduled, in
/// seconds.
pub const NODE_REFRESH_INTERVAL_SECS: i64 = 24 * 3600;

/// Current UNIX time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
