//! Insert parsed reference documents, remapping batch-local parent indices to row ids.

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};

use crate::{ParsedDat, ParsedRdb};

use super::{
    INSERT_CANDIDATE_SQL, INSERT_COLLECTION_SQL, INSERT_DATASET_ENTRY_SQL, INSERT_DATASET_SQL,
    INSERT_ITEM_SQL,
};

fn parent_id(ids: &[i64], index: usize, what: &str, source: &str) -> Result<i64> {
    ids.get(index)
        .copied()
        .ok_or_else(|| anyhow!("{source}: {what} references unknown parent #{index}"))
}

/// Insert one archive-description document in a single transaction.
pub fn insert_parsed_dat(conn: &mut Connection, parsed: &ParsedDat) -> Result<()> {
    let source = parsed.filepath.as_str();
    let tx = conn.transaction().context("begin transaction")?;
    {
        let mut dataset_ids = Vec::with_capacity(parsed.datasets.len());
        let mut stmt = tx.prepare(INSERT_DATASET_SQL).context("prepare dataset insert")?;
        for d in &parsed.datasets {
            stmt.execute(params![
                d.filepath,
                d.name,
                d.description,
                d.category,
                d.version,
                d.author,
                d.email,
                d.homepage,
                d.url
            ])
            .with_context(|| format!("insert dataset {}", d.filepath))?;
            dataset_ids.push(tx.last_insert_rowid());
        }

        let mut entry_ids = Vec::with_capacity(parsed.entries.len());
        let mut stmt = tx
            .prepare(INSERT_DATASET_ENTRY_SQL)
            .context("prepare entry insert")?;
        for e in &parsed.entries {
            let dataset_id = parent_id(&dataset_ids, e.dataset, "entry", source)?;
            stmt.execute(params![dataset_id, e.name, e.description])
                .with_context(|| format!("insert entry {}", e.name))?;
            entry_ids.push(tx.last_insert_rowid());
        }

        let mut stmt = tx
            .prepare(INSERT_CANDIDATE_SQL)
            .context("prepare candidate insert")?;
        for c in &parsed.candidates {
            let entry_id = parent_id(&entry_ids, c.entry, "candidate", source)?;
            stmt.execute(params![entry_id, c.name, c.size as i64, c.sha1, c.md5, c.crc32])
                .with_context(|| format!("insert candidate {}", c.name))?;
        }
    }
    tx.commit().context("commit transaction")?;
    Ok(())
}

/// Insert one binary reference database in a single transaction.
pub fn insert_parsed_rdb(conn: &mut Connection, parsed: &ParsedRdb) -> Result<()> {
    let source = parsed.filepath.as_str();
    let tx = conn.transaction().context("begin transaction")?;
    {
        let mut collection_ids = Vec::with_capacity(parsed.collections.len());
        let mut stmt = tx
            .prepare(INSERT_COLLECTION_SQL)
            .context("prepare collection insert")?;
        for c in &parsed.collections {
            stmt.execute(params![c.filepath, c.name])
                .with_context(|| format!("insert collection {}", c.filepath))?;
            collection_ids.push(tx.last_insert_rowid());
        }

        let mut stmt = tx.prepare(INSERT_ITEM_SQL).context("prepare item insert")?;
        for item in &parsed.items {
            let collection_id = parent_id(&collection_ids, item.collection, "item", source)?;
            stmt.execute(params![
                collection_id,
                item.name,
                item.sha1,
                item.md5,
                item.crc32,
                item.size.map(|s| s as i64)
            ])
            .with_context(|| format!("insert item {}", item.name))?;
        }
    }
    tx.commit().context("commit transaction")?;
    Ok(())
}
