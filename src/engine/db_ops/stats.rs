use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::StorageStats;
use crate::utils::config::ARCHIVE_MIME;

fn count(conn: &Connection, sql: &str) -> Result<usize> {
    let n: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("count rows: {sql}"))?;
    Ok(n.max(0) as usize)
}

/// Row counts across the store.
pub fn storage_stats(conn: &Connection) -> Result<StorageStats> {
    let files_zipped: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM catalog WHERE mimetype = ?1",
            [ARCHIVE_MIME],
            |row| row.get(0),
        )
        .context("count zipped files")?;
    Ok(StorageStats {
        files: count(conn, "SELECT COUNT(*) FROM catalog")?,
        files_zipped: files_zipped.max(0) as usize,
        files_corrupted: count(
            conn,
            "SELECT COUNT(*) FROM catalog WHERE corrupted IS NOT NULL",
        )?,
        datasets: count(conn, "SELECT COUNT(*) FROM datasets")?,
        dataset_entries: count(conn, "SELECT COUNT(*) FROM dataset_entries")?,
        candidates: count(conn, "SELECT COUNT(*) FROM candidates")?,
        collections: count(conn, "SELECT COUNT(*) FROM collections")?,
        items: count(conn, "SELECT COUNT(*) FROM items")?,
    })
}
