//! Read queries feeding the address source.

use crate::{StoreError, StoreResult};
use crawler_protocol::Endpoint;
use rusqlite::types::Value;
use rusqlite::{params, Connection};

const COUNT_KNOWN: &str = "SELECT COUNT(*) FROM nodes WHERE success = 1";

const SELECT_DUE: &str = "SELECT ip, port FROM nodes \
     WHERE port != 0 AND next_refresh < ?1 \
     ORDER BY next_refresh \
     LIMIT ?2";

const COUNT_DUE: &str = "SELECT COUNT(*) FROM nodes WHERE port != 0 AND next_refresh < ?1";

/// Whether the store holds any peer that ever completed a handshake.
pub fn have_known_nodes(conn: &Connection) -> StoreResult<bool> {
    let count: i64 = conn
        .query_row(COUNT_KNOWN, [], |row| row.get(0))
        .map_err(StoreError::query(COUNT_KNOWN))?;

    Ok(count != 0)
}

/// Endpoints whose refresh deadline has elapsed, oldest first, plus
/// the total number of eligible rows.
pub fn addresses_to_update(
    conn: &Connection,
    limit: usize,
    now: i64,
) -> StoreResult<(Vec<Endpoint>, i64)> {
    let mut stmt = conn
        .prepare(SELECT_DUE)
        .map_err(StoreError::query(SELECT_DUE))?;

    let rows = stmt
        .query_map(params![now, limit as i64], |row| {
            let ip: String = row.get(0)?;
            // The port column normally holds an integer, but a corrupt
            // row must still flow through the pipeline, where it is
            // treated as unreachable.
            let port = match row.get::<_, Value>(1)? {
                Value::Integer(n) => n.to_string(),
                Value::Text(s) => s,
                Value::Real(f) => f.to_string(),
                Value::Null | Value::Blob(_) => String::new(),
            };
            Ok(Endpoint::new(ip, port))
        })
        .map_err(StoreError::query(SELECT_DUE))?;

    let endpoints = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::query(SELECT_DUE))?;

    let eligible: i64 = conn
        .query_row(COUNT_DUE, params![now], |row| row.get(0))
        .map_err(StoreError::query(COUNT_DUE))?;

    Ok((endpoints, eligible))
}
