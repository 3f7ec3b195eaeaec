//! Store error types.

use thiserror::Error;

/// Store errors. These are fatal to the crawl: the writer gives up
/// rather than dropping results silently.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error without statement context.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A specific statement failed.
    #[error("query failed: {sql}: {source}")]
    Query {
        sql: &'static str,
        source: rusqlite::Error,
    },

    /// The connection pool was drained and closed.
    #[error("connection pool closed")]
    PoolClosed,

    /// A blocking database task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Attach the offending SQL to a driver error.
    pub(crate) fn query(sql: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
        move |source| StoreError::Query { sql, source }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
