//! Snapshot transfer between the working store and a standalone file.
//!
//! The snapshot is attached under [`SNAPSHOT_SCHEMA`]; each table is copied in row batches of
//! `TRANSFER_PAGE_MULTIPLIER * page_size` inside one transaction per table, ids preserved.

use anyhow::{Context, Result, bail};
use log::debug;
use rusqlite::Connection;
use std::path::Path;

use crate::utils::config::TRANSFER_PAGE_MULTIPLIER;
use crate::utils::{prepare_snapshot_work_path, rename_temp_to_final};

use super::{TABLE_COLUMNS, open_db};

const SNAPSHOT_SCHEMA: &str = "snapshot";

/// Per-batch progress: (table, rows copied so far for that table).
pub type TransferProgress<'a> = Option<&'a dyn Fn(&str, usize)>;

fn attach(conn: &Connection, path: &Path) -> Result<()> {
    conn.execute(
        &format!("ATTACH DATABASE ?1 AS {SNAPSHOT_SCHEMA}"),
        [path.to_string_lossy().as_ref()],
    )
    .with_context(|| format!("attach snapshot {}", path.display()))?;
    Ok(())
}

fn detach(conn: &Connection) -> Result<()> {
    conn.execute(&format!("DETACH DATABASE {SNAPSHOT_SCHEMA}"), [])
        .context("detach snapshot")?;
    Ok(())
}

/// Run `body` with the snapshot attached; always detach afterwards.
fn with_attached<T>(
    conn: &mut Connection,
    path: &Path,
    body: impl FnOnce(&mut Connection) -> Result<T>,
) -> Result<T> {
    attach(conn, path)?;
    let result = body(conn);
    let detached = detach(conn);
    let value = result?;
    detached?;
    Ok(value)
}

fn table_exists(conn: &Connection, schema: &str, table: &str) -> Result<bool> {
    let n: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM {schema}.sqlite_master WHERE type = 'table' AND name = ?1"
            ),
            [table],
            |row| row.get(0),
        )
        .with_context(|| format!("look up table {schema}.{table}"))?;
    Ok(n > 0)
}

fn batch_rows(conn: &Connection, schema: &str) -> Result<i64> {
    let page_size: i64 = conn
        .query_row(&format!("PRAGMA {schema}.page_size"), [], |row| row.get(0))
        .with_context(|| format!("read {schema} page size"))?;
    Ok((page_size * TRANSFER_PAGE_MULTIPLIER).max(1))
}

/// Copy one table from `from` to `to` in batches, inside a single transaction.
fn transfer_table(
    conn: &mut Connection,
    from: &str,
    to: &str,
    table: &str,
    columns: &str,
    batch: i64,
    on_batch: TransferProgress<'_>,
) -> Result<usize> {
    let sql = format!(
        "INSERT INTO {to}.{table} ({columns}) SELECT {columns} FROM {from}.{table} \
         ORDER BY id LIMIT ?1 OFFSET ?2"
    );
    let tx = conn.transaction().context("begin transaction")?;
    let mut copied = 0usize;
    {
        let mut stmt = tx
            .prepare(&sql)
            .with_context(|| format!("prepare transfer of {table}"))?;
        loop {
            let n = stmt
                .execute([batch, copied as i64])
                .with_context(|| format!("transfer rows of {table}"))?;
            copied += n;
            if let Some(cb) = on_batch {
                cb(table, copied);
            }
            if (n as i64) < batch {
                break;
            }
        }
    }
    tx.commit().context("commit transaction")?;
    Ok(copied)
}

/// Load a snapshot file into an empty working store.
///
/// Fails if the file cannot be attached or lacks any of the store's tables.
pub fn load_from(conn: &mut Connection, path: &Path, on_batch: TransferProgress<'_>) -> Result<()> {
    with_attached(conn, path, |conn| {
        for (table, _) in TABLE_COLUMNS {
            if !table_exists(conn, SNAPSHOT_SCHEMA, table)? {
                bail!(
                    "snapshot {} could not be read: table {table} is missing",
                    path.display()
                );
            }
        }
        let batch = batch_rows(conn, SNAPSHOT_SCHEMA)?;
        for (table, columns) in TABLE_COLUMNS {
            let n = transfer_table(conn, SNAPSHOT_SCHEMA, "main", table, columns, batch, on_batch)?;
            debug!("loaded {n} {table} rows from {}", path.display());
        }
        Ok(())
    })
    .with_context(|| format!("load snapshot {}", path.display()))
}

/// Save the working store to `path`. Writes a temp file next to it and renames it into place.
pub fn save_to(conn: &mut Connection, path: &Path, on_batch: TransferProgress<'_>) -> Result<()> {
    let temp = prepare_snapshot_work_path(path)?;
    // Tables are created up front so every copy targets the same schema.
    drop(open_db(&temp)?);
    with_attached(conn, &temp, |conn| {
        let batch = batch_rows(conn, "main")?;
        for (table, columns) in TABLE_COLUMNS {
            let n = transfer_table(conn, "main", SNAPSHOT_SCHEMA, table, columns, batch, on_batch)?;
            debug!("saved {n} {table} rows to {}", path.display());
        }
        Ok(())
    })
    .with_context(|| format!("save snapshot {}", path.display()))?;
    rename_temp_to_final(&temp, path)
}
