//! Open the working store or a snapshot file.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use super::{CONNECTION_PRAGMAS, SCHEMA};

/// Apply connection pragmas and schema to an open connection (idempotent).
fn apply_pragmas_and_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CONNECTION_PRAGMAS)
        .context("set connection pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

/// Open or create a file-backed store with the full schema. Used for snapshot files.
pub fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("open database {}", path.display()))?;
    apply_pragmas_and_schema(&conn)?;
    Ok(conn)
}

/// Open the in-memory working store. Snapshots are loaded into and saved from it.
pub fn open_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory database")?;
    apply_pragmas_and_schema(&conn)?;
    Ok(conn)
}
