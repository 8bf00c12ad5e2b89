//! Resolve a catalog entry against the reference datasets.
//!
//! Exact match (DAT candidates): sha1, md5 and crc32 all equal.
//!
//! Fuzzy match (RDB items), in priority order:
//! - item has sha1: sha1 must be equal; md5, crc32 and size are compared only when the item
//!   records them.
//! - item has no sha1: md5, crc32 and size must all be recorded on the item and equal.
//!
//! Corrupted or not yet fingerprinted entries never match. Both queries are read-only.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::engine::db_ops::get_entry;
use crate::{Candidate, CatalogEntry, ExactMatch, Fingerprint, FuzzyMatch, Item};

/// Candidate and fingerprint hashes are equal byte for byte.
pub fn exact_matches(candidate: &Candidate, fp: &Fingerprint) -> bool {
    candidate.sha1 == fp.sha1 && candidate.md5 == fp.md5 && candidate.crc32 == fp.crc32
}

/// Fuzzy rule for one item (see module docs).
pub fn fuzzy_matches(item: &Item, fp: &Fingerprint) -> bool {
    match &item.sha1 {
        Some(sha1) => {
            *sha1 == fp.sha1
                && item.md5.as_ref().is_none_or(|md5| *md5 == fp.md5)
                && item.crc32.as_ref().is_none_or(|crc| *crc == fp.crc32)
                && item.size.is_none_or(|size| size == fp.size)
        }
        None => {
            item.md5.as_ref() == Some(&fp.md5)
                && item.crc32.as_ref() == Some(&fp.crc32)
                && item.size == Some(fp.size)
        }
    }
}

/// The entry's fingerprint, or None when it must not take part in matching.
fn matchable_fingerprint(entry: &CatalogEntry) -> Option<Fingerprint> {
    if entry.corrupted.is_some() {
        return None;
    }
    entry.fingerprint()
}

const EXACT_MATCH_SQL: &str = r#"
SELECT d.filepath, d.name, d.description, d.category, e.name, e.description, c.name
FROM candidates c
JOIN dataset_entries e ON e.id = c.entry_id
JOIN datasets d ON d.id = e.dataset_id
WHERE c.sha1 = ?1 AND c.md5 = ?2 AND c.crc32 = ?3
ORDER BY d.id, e.id, c.id
LIMIT 1
"#;

/// First candidate (dataset, entry, candidate insertion order) matching `filepath` exactly.
pub fn find_exact_match(conn: &Connection, filepath: &str) -> Result<Option<ExactMatch>> {
    let Some(entry) = get_entry(conn, filepath)? else {
        return Ok(None);
    };
    let Some(fp) = matchable_fingerprint(&entry) else {
        return Ok(None);
    };
    conn.query_row(EXACT_MATCH_SQL, params![fp.sha1, fp.md5, fp.crc32], |row| {
        Ok(ExactMatch {
            filepath: entry.filepath.clone(),
            extension: entry.extension.clone(),
            mimetype: entry.mimetype.clone(),
            dataset_filepath: row.get(0)?,
            dataset_name: row.get(1)?,
            dataset_description: row.get(2)?,
            dataset_category: row.get(3)?,
            entry_name: row.get(4)?,
            entry_description: row.get(5)?,
            candidate_name: row.get(6)?,
        })
    })
    .optional()
    .with_context(|| format!("exact match for {filepath}"))
}

// Index-backed prefilter; `fuzzy_matches` makes the final decision.
const FUZZY_CANDIDATES_SQL: &str = r#"
SELECT i.name, i.sha1, i.md5, i.crc32, i.size, c.filepath, c.name
FROM items i
JOIN collections c ON c.id = i.collection_id
WHERE i.sha1 = ?1 OR (i.sha1 IS NULL AND i.md5 = ?2)
ORDER BY c.id, i.id
"#;

/// First item (collection, item insertion order) fuzzily matching `filepath`.
pub fn find_fuzzy_match(conn: &Connection, filepath: &str) -> Result<Option<FuzzyMatch>> {
    let Some(entry) = get_entry(conn, filepath)? else {
        return Ok(None);
    };
    let Some(fp) = matchable_fingerprint(&entry) else {
        return Ok(None);
    };
    let mut stmt = conn
        .prepare_cached(FUZZY_CANDIDATES_SQL)
        .context("prepare fuzzy match query")?;
    let mut rows = stmt
        .query(params![fp.sha1, fp.md5])
        .with_context(|| format!("fuzzy match for {filepath}"))?;
    while let Some(row) = rows.next()? {
        let size: Option<i64> = row.get(4)?;
        let item = Item {
            collection: 0,
            name: row.get(0)?,
            sha1: row.get(1)?,
            md5: row.get(2)?,
            crc32: row.get(3)?,
            size: size.map(|s| s.max(0) as u64),
        };
        if fuzzy_matches(&item, &fp) {
            return Ok(Some(FuzzyMatch {
                filepath: entry.filepath,
                extension: entry.extension,
                mimetype: entry.mimetype,
                collection_filepath: row.get(5)?,
                collection_name: row.get(6)?,
                item_name: item.name,
            }));
        }
    }
    Ok(None)
}
