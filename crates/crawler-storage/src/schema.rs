//! Schema setup.

use crate::{StoreError, StoreResult};
use rusqlite::Connection;

// Type DATE is used instead of DATETIME so drivers do not try to
// convert the underlying integer into a calendar value; SQLite treats
// both as NUMERIC affinity.
const CREATE_NODES: &str = r#"
    CREATE TABLE IF NOT EXISTS "nodes" (
        "id"           INTEGER PRIMARY KEY AUTOINCREMENT,

        "ip"           TEXT NOT NULL,
        "port"         INTEGER NOT NULL,
        "protocol"     INTEGER NOT NULL DEFAULT 0,
        "user_agent"   TEXT DEFAULT '',

        "online"       BOOLEAN NOT NULL DEFAULT 0,
        "success"      BOOLEAN NOT NULL DEFAULT 0,

        "next_refresh" DATE NOT NULL DEFAULT 0,

        "online_at"    DATE NOT NULL DEFAULT 0,
        "success_at"   DATE NOT NULL DEFAULT 0,

        "created_at"   DATE NOT NULL DEFAULT (strftime('%s', 'now')),
        "updated_at"   DATE NOT NULL,

        UNIQUE (ip, port)
    )
"#;

const CREATE_NODES_KNOWN: &str = r#"
    CREATE TABLE IF NOT EXISTS "nodes_known" (
        "id" INTEGER PRIMARY KEY,

        "id_source" INTEGER,
        "id_known"  INTEGER,

        "created_at" DATE DEFAULT (strftime('%s', 'now')),
        "updated_at" DATE,

        UNIQUE (id_source, id_known)
    )
"#;

const INDEX_IP_PORT: &str = "CREATE INDEX IF NOT EXISTS node_ip_port ON nodes (ip, port)";

const INDEX_SOURCE_KNOWN: &str =
    "CREATE INDEX IF NOT EXISTS nodes_known_source_known ON nodes_known (id_source, id_known)";

/// Create tables and indexes. Safe to run on every startup.
pub fn setup(conn: &Connection) -> StoreResult<()> {
    for sql in [
        CREATE_NODES,
        CREATE_NODES_KNOWN,
        INDEX_IP_PORT,
        INDEX_SOURCE_KNOWN,
    ] {
        conn.execute(sql, []).map_err(StoreError::query(sql))?;
    }
    Ok(())
}
