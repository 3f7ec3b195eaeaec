//! Connection pool.

use crate::{schema, StoreError, StoreResult};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

/// A fixed set of SQLite connections handed out through a bounded
/// channel: acquiring blocks until a handle is free, releasing returns
/// it. All connections run in WAL mode so concurrent readers never
/// block the single writer.
pub struct Pool {
    handles: Mutex<mpsc::Receiver<Connection>>,
    free: mpsc::Sender<Connection>,
    size: usize,
}

impl Pool {
    /// Open `size` connections to the database at `path`, creating the
    /// schema if needed.
    pub fn open(path: &Path, size: usize) -> StoreResult<Self> {
        info!(path = %path.display(), size, "initializing store connections");

        let (free, handles) = mpsc::channel(size);
        for i in 0..size {
            let conn = Connection::open(path)?;
            configure(&conn)?;
            if i == 0 {
                schema::setup(&conn)?;
            }
            free.try_send(conn).map_err(|_| StoreError::PoolClosed)?;
        }

        Ok(Self {
            handles: Mutex::new(handles),
            free,
            size,
        })
    }

    /// Take a connection, waiting until one is free.
    pub async fn acquire(&self) -> StoreResult<Connection> {
        self.handles
            .lock()
            .await
            .recv()
            .await
            .ok_or(StoreError::PoolClosed)
    }

    /// Return a connection to the pool.
    pub fn release(&self, conn: Connection) {
        // The channel holds exactly `size` slots, so this cannot fill.
        let _ = self.free.try_send(conn);
    }

    /// Run a blocking store operation on a pooled connection.
    ///
    /// The connection is held for the duration of `f` only; callers
    /// scope one transaction per call.
    pub async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.acquire().await?;

        let (conn, out) = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            let out = f(&mut conn);
            (conn, out)
        })
        .await?;

        self.release(conn);
        out
    }

    /// Drain and close every connection.
    pub async fn close(&self) {
        info!("cleaning up store connections");

        let mut handles = self.handles.lock().await;
        for _ in 0..self.size {
            if handles.recv().await.is_none() {
                break;
            }
        }
    }
}

fn configure(conn: &Connection) -> StoreResult<()> {
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_release_cycle() {
        let dir = TempDir::new().unwrap();
        let pool = Pool::open(&dir.path().join("crawler.db"), 2).unwrap();

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        pool.release(a);
        pool.release(b);

        // Both handles are usable again.
        let c = pool.acquire().await.unwrap();
        let count: i64 = c
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        pool.release(c);

        pool.close().await;
    }

    #[tokio::test]
    async fn test_with_conn_runs_and_returns() {
        let dir = TempDir::new().unwrap();
        let pool = Pool::open(&dir.path().join("crawler.db"), 1).unwrap();

        let count = pool
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO nodes (ip, port, updated_at) VALUES ('1.1.1.1', 1, 0)",
                    [],
                )?;
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .unwrap();

        assert_eq!(count, 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_schema_created_on_open() {
        let dir = TempDir::new().unwrap();
        let pool = Pool::open(&dir.path().join("crawler.db"), 1).unwrap();

        let conn = pool.acquire().await.unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('nodes', 'nodes_known')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);

        pool.release(conn);
        pool.close().await;
    }
}
