//! Transactional reconciliation of crawl results.

use crate::{StoreError, StoreResult, NODE_REFRESH_INTERVAL_SECS};
use crawler_protocol::CrawlResult;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashSet;

/// Result of resolving a row id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeId {
    /// Not looked up yet.
    #[default]
    Unknown,
    /// Looked up and not in the store.
    Absent,
    /// Present with this id.
    Present(i64),
}

/// A `nodes` row as read and written by the reconciliation.
#[derive(Debug, Default, PartialEq, Eq)]
struct NodeRow {
    id: NodeId,

    ip: String,
    port: String,

    protocol: u32,
    user_agent: String,

    online: bool,
    online_at: i64,
    success: bool,
    success_at: i64,

    next_refresh: i64,
}

const SELECT_NODE: &str = "SELECT id, protocol, user_agent, online, online_at, \
            success, success_at, next_refresh \
     FROM nodes WHERE ip = ?1 AND port = ?2";

const SELECT_NODE_ID: &str = "SELECT id FROM nodes WHERE ip = ?1 AND port = ?2";

const INSERT_NODE: &str = "INSERT INTO nodes (ip, port, next_refresh, protocol, user_agent, \
            online, online_at, success, success_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const UPDATE_NODE: &str = "UPDATE nodes SET next_refresh = ?1, protocol = ?2, user_agent = ?3, \
            online = ?4, online_at = ?5, success = ?6, success_at = ?7, updated_at = ?8 \
     WHERE id = ?9";

const INSERT_NEIGHBOUR: &str =
    "INSERT INTO nodes (ip, port, next_refresh, updated_at) VALUES (?1, ?2, ?3, ?4)";

const UPDATE_NEIGHBOUR: &str =
    "UPDATE nodes SET next_refresh = ?1, updated_at = ?2 WHERE id = ?3";

const SELECT_NEIGHBOUR: &str = "SELECT id, next_refresh FROM nodes WHERE ip = ?1 AND port = ?2";

const SELECT_EDGE: &str = "SELECT id FROM nodes_known WHERE id_source = ?1 AND id_known = ?2";

const INSERT_EDGE: &str =
    "INSERT INTO nodes_known (id_source, id_known, updated_at) VALUES (?1, ?2, ?3)";

const UPDATE_EDGE: &str = "UPDATE nodes_known SET updated_at = ?1 WHERE id = ?2";

/// Reconcile one crawl result with the store inside a single
/// transaction. Every timestamp written shares the captured `now`.
///
/// An unreachable peer is parked (`next_refresh = 0`) until it shows
/// up again as somebody's neighbour; a reachable one is rescheduled
/// [`NODE_REFRESH_INTERVAL_SECS`] ahead. `protocol` and `user_agent`
/// are overwritten from whatever `version` the peer sent, on any
/// outcome.
pub fn save_result(conn: &mut Connection, result: &CrawlResult, now: i64) -> StoreResult<()> {
    let tx = conn.transaction()?;

    let mut row = get_node(&tx, &result.endpoint.ip, &result.endpoint.port)?;

    if result.online {
        row.online = true;
        row.online_at = now;
        row.next_refresh = now + NODE_REFRESH_INTERVAL_SECS;
    } else {
        row.online = false;
        row.next_refresh = 0; // parked until rediscovered
    }

    if let Some(version) = &result.version {
        row.protocol = version.protocol;
        row.user_agent = version.user_agent.clone();
        row.success = true;
        row.success_at = now;
    } else {
        row.success = false;
    }

    let source_id = put_node(&tx, &mut row, now)?;

    save_neighbours(&tx, source_id, row.next_refresh, result, now)?;

    tx.commit()?;
    Ok(())
}

/// Read a node row by endpoint; `id` is [`NodeId::Absent`] when the
/// row does not exist.
fn get_node(tx: &Transaction, ip: &str, port: &str) -> StoreResult<NodeRow> {
    let row = tx
        .query_row(SELECT_NODE, params![ip, port], |r| {
            Ok(NodeRow {
                id: NodeId::Present(r.get(0)?),
                ip: ip.to_string(),
                port: port.to_string(),
                protocol: r.get(1)?,
                user_agent: r.get(2)?,
                online: r.get(3)?,
                online_at: r.get(4)?,
                success: r.get(5)?,
                success_at: r.get(6)?,
                next_refresh: r.get(7)?,
            })
        })
        .optional()
        .map_err(StoreError::query(SELECT_NODE))?;

    Ok(row.unwrap_or_else(|| NodeRow {
        id: NodeId::Absent,
        ip: ip.to_string(),
        port: port.to_string(),
        ..NodeRow::default()
    }))
}

/// Insert or update a node row, resolving its id first if necessary.
/// Returns the row id.
fn put_node(tx: &Transaction, row: &mut NodeRow, now: i64) -> StoreResult<i64> {
    let id = match row.id {
        NodeId::Unknown => tx
            .query_row(SELECT_NODE_ID, params![row.ip, row.port], |r| r.get(0))
            .optional()
            .map_err(StoreError::query(SELECT_NODE_ID))?,
        NodeId::Absent => None,
        NodeId::Present(id) => Some(id),
    };

    let id = match id {
        None => {
            tx.execute(
                INSERT_NODE,
                params![
                    row.ip,
                    row.port,
                    row.next_refresh,
                    row.protocol,
                    row.user_agent,
                    row.online,
                    row.online_at,
                    row.success,
                    row.success_at,
                    now
                ],
            )
            .map_err(StoreError::query(INSERT_NODE))?;
            tx.last_insert_rowid()
        }
        Some(id) => {
            tx.execute(
                UPDATE_NODE,
                params![
                    row.next_refresh,
                    row.protocol,
                    row.user_agent,
                    row.online,
                    row.online_at,
                    row.success,
                    row.success_at,
                    now,
                    id
                ],
            )
            .map_err(StoreError::query(UPDATE_NODE))?;
            id
        }
    };

    row.id = NodeId::Present(id);
    Ok(id)
}

/// Upsert every neighbour the peer reported and the edges pointing at
/// them. Statements are prepared once and reused; `addr` replies
/// routinely carry a thousand entries.
fn save_neighbours(
    tx: &Transaction,
    source_id: i64,
    source_next_refresh: i64,
    result: &CrawlResult,
    now: i64,
) -> StoreResult<()> {
    if result.addresses.is_empty() {
        return Ok(());
    }

    let mut select_node = tx
        .prepare(SELECT_NEIGHBOUR)
        .map_err(StoreError::query(SELECT_NEIGHBOUR))?;
    let mut insert_node = tx
        .prepare(INSERT_NEIGHBOUR)
        .map_err(StoreError::query(INSERT_NEIGHBOUR))?;
    let mut update_node = tx
        .prepare(UPDATE_NEIGHBOUR)
        .map_err(StoreError::query(UPDATE_NEIGHBOUR))?;
    let mut select_edge = tx
        .prepare(SELECT_EDGE)
        .map_err(StoreError::query(SELECT_EDGE))?;
    let mut insert_edge = tx
        .prepare(INSERT_EDGE)
        .map_err(StoreError::query(INSERT_EDGE))?;
    let mut update_edge = tx
        .prepare(UPDATE_EDGE)
        .map_err(StoreError::query(UPDATE_EDGE))?;

    let mut seen = HashSet::new();

    for addr in &result.addresses {
        let endpoint = addr.endpoint();
        if !seen.insert(endpoint.to_string()) {
            continue;
        }

        let existing: Option<(i64, i64)> = select_node
            .query_row(params![endpoint.ip, endpoint.port], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .optional()
            .map_err(StoreError::query(SELECT_NEIGHBOUR))?;

        let neighbour_id = match existing {
            None => {
                // A fresh skeleton row; it schedules together with the
                // peer that referred it.
                insert_node
                    .execute(params![endpoint.ip, endpoint.port, source_next_refresh, now])
                    .map_err(StoreError::query(INSERT_NEIGHBOUR))?;
                tx.last_insert_rowid()
            }
            Some((id, next_refresh)) => {
                // Overdue neighbours are pulled onto the crawled
                // peer's schedule; future deadlines stay put.
                if next_refresh < now {
                    update_node
                        .execute(params![source_next_refresh, now, id])
                        .map_err(StoreError::query(UPDATE_NEIGHBOUR))?;
                }
                id
            }
        };

        let edge: Option<i64> = select_edge
            .query_row(params![source_id, neighbour_id], |r| r.get(0))
            .optional()
            .map_err(StoreError::query(SELECT_EDGE))?;

        match edge {
            None => {
                insert_edge
                    .execute(params![source_id, neighbour_id, now])
                    .map_err(StoreError::query(INSERT_EDGE))?;
            }
            Some(edge_id) => {
                update_edge
                    .execute(params![now, edge_id])
                    .map_err(StoreError::query(UPDATE_EDGE))?;
            }
        }
    }

    Ok(())
}
