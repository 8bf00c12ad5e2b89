//! Catalog rows (one per ROM file) and kind-generic source-path queries used by the indexers.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;

use crate::{CatalogEntry, FingerprintedFile};

use super::{CatalogKind, UPSERT_CORRUPTED_SQL, UPSERT_FINGERPRINT_SQL};

const ENTRY_COLUMNS: &str = "filepath, extension, mimetype, size, sha1, md5, crc32, corrupted";

/// Insert or update a file's fingerprint. Clears any previous `corrupted` mark.
pub fn upsert_fingerprint(conn: &Connection, file: &FingerprintedFile) -> Result<()> {
    let fp = &file.fingerprint;
    conn.execute(
        UPSERT_FINGERPRINT_SQL,
        params![
            file.filepath,
            file.extension,
            file.mimetype,
            fp.size as i64,
            fp.sha1,
            fp.md5,
            fp.crc32
        ],
    )
    .with_context(|| format!("store fingerprint of {}", file.filepath))?;
    Ok(())
}

/// Record a file as corrupted with `reason`. Existing hash fields are left as they were.
pub fn mark_corrupted(
    conn: &Connection,
    filepath: &str,
    extension: Option<&str>,
    mimetype: Option<&str>,
    reason: &str,
) -> Result<()> {
    conn.execute(
        UPSERT_CORRUPTED_SQL,
        params![filepath, extension, mimetype, reason],
    )
    .with_context(|| format!("mark {filepath} as corrupted"))?;
    Ok(())
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    let size: Option<i64> = row.get(3)?;
    Ok(CatalogEntry {
        filepath: row.get(0)?,
        extension: row.get(1)?,
        mimetype: row.get(2)?,
        size: size.map(|s| s.max(0) as u64),
        sha1: row.get(4)?,
        md5: row.get(5)?,
        crc32: row.get(6)?,
        corrupted: row.get(7)?,
    })
}

pub fn get_entry(conn: &Connection, filepath: &str) -> Result<Option<CatalogEntry>> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM catalog WHERE filepath = ?1"),
        [filepath],
        entry_from_row,
    )
    .optional()
    .with_context(|| format!("read catalog entry {filepath}"))
}

/// All catalog entries in insertion order, corrupted ones included.
pub fn list_entries(conn: &Connection) -> Result<Vec<CatalogEntry>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM catalog ORDER BY id"))
        .context("prepare catalog listing")?;
    let rows = stmt.query_map([], entry_from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("list catalog entries")
}

/// Every source path recorded for `kind`.
pub fn recorded_paths(conn: &Connection, kind: CatalogKind) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("SELECT filepath FROM {} ORDER BY id", kind.table()))
        .with_context(|| format!("prepare {} listing", kind.label()))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("list recorded {}", kind.label()))
}

/// Source paths that need no further processing.
///
/// Files count as known once all three digests are stored or the file is marked corrupted;
/// reference documents count as known as soon as their root row exists.
pub fn known_paths(conn: &Connection, kind: CatalogKind) -> Result<HashSet<String>> {
    let sql = match kind {
        CatalogKind::Files => {
            "SELECT filepath FROM catalog WHERE corrupted IS NOT NULL \
             OR (sha1 IS NOT NULL AND md5 IS NOT NULL AND crc32 IS NOT NULL)"
                .to_string()
        }
        _ => format!("SELECT filepath FROM {}", kind.table()),
    };
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare known {} query", kind.label()))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect::<rusqlite::Result<HashSet<_>>>()
        .with_context(|| format!("query known {}", kind.label()))
}

/// Delete one source path and (through cascades) everything below it. Returns rows removed.
pub fn remove_path(conn: &Connection, kind: CatalogKind, filepath: &str) -> Result<usize> {
    conn.execute(
        &format!("DELETE FROM {} WHERE filepath = ?1", kind.table()),
        [filepath],
    )
    .with_context(|| format!("remove {filepath} from {}", kind.label()))
}
