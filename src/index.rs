//! Catalog sessions: load the store, run the indexers, save it back.

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::db_ops::{CatalogKind, load_from, open_db_in_memory, save_to, storage_stats};
use crate::pipeline::{IndexReport, RunContext, index_dats, index_rdbs, index_roms, prune};
use crate::{Opts, StorageStats};

/// Working store plus the run context its indexers use.
pub struct Session {
    pub conn: Connection,
    pub ctx: RunContext,
    storage: Option<PathBuf>,
}

/// Reference sources to refresh alongside the ROM catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sources<'a> {
    pub dat_dir: Option<&'a Path>,
    /// `(rdb directory, decoder tool)`.
    pub rdb: Option<(&'a Path, &'a Path)>,
}

fn log_transfer_batch(table: &str, rows: usize) {
    debug!("  {table}: {rows} rows");
}

/// Install the Ctrl-C handler and return its flag. A second install in one process is ignored.
pub fn cancel_flag() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    if let Err(err) = ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    }) {
        debug!("Ctrl+C handler not installed: {err}");
    }
    cancel
}

impl Session {
    /// Open an in-memory store and, when `opts.storage` names an existing snapshot, load it.
    pub fn open(opts: &Opts, cancel: Arc<AtomicBool>) -> Result<Self> {
        let mut conn = open_db_in_memory()?;
        if let Some(path) = &opts.storage {
            if path.exists() {
                info!("Loading catalog from {}", path.display());
                load_from(&mut conn, path, Some(&log_transfer_batch))?;
            } else {
                info!(
                    "No catalog at {}; reindexing everything",
                    path.display()
                );
            }
        }
        Ok(Self {
            conn,
            ctx: RunContext::new(opts, cancel),
            storage: opts.storage.clone(),
        })
    }

    /// Refresh the ROM catalog for `inputs` and the given reference sources.
    pub fn index(&mut self, inputs: &[PathBuf], sources: Sources<'_>) -> Result<Vec<IndexReport>> {
        let mut reports = vec![index_roms(&self.conn, inputs, &self.ctx)?];
        if let Some(dir) = sources.dat_dir {
            reports.push(index_dats(&mut self.conn, dir, &self.ctx)?);
        }
        if let Some((dir, tool)) = sources.rdb {
            reports.push(index_rdbs(&mut self.conn, dir, tool, &self.ctx)?);
        }
        let stats = self.stats()?;
        info!(
            "Indexing complete: {} files ({} zipped, {} corrupted), {} datasets / {} entries / {} candidates, {} collections / {} items",
            stats.files,
            stats.files_zipped,
            stats.files_corrupted,
            stats.datasets,
            stats.dataset_entries,
            stats.candidates,
            stats.collections,
            stats.items
        );
        Ok(reports)
    }

    /// Drop catalog entries whose file is gone. Returns the number removed.
    pub fn prune_files(&self) -> Result<usize> {
        prune(&self.conn, CatalogKind::Files, &self.ctx)
    }

    pub fn stats(&self) -> Result<StorageStats> {
        storage_stats(&self.conn)
    }

    /// Save to the snapshot path, if one was configured.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.storage.clone() else {
            return Ok(());
        };
        info!("Saving catalog to {}", path.display());
        save_to(&mut self.conn, &path, Some(&log_transfer_batch))
            .with_context(|| format!("persist catalog to {}", path.display()))
    }
}
