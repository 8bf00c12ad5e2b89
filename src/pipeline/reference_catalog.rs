//! Reference document indexers (DAT and RDB): prune, discover, filter-known, parse in the pool.
//!
//! A document that fails to parse is logged and left out of the store, so the next run tries it
//! again.

use anyhow::Result;
use log::{debug, info, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::engine::db_ops::{CatalogKind, insert_parsed_dat, insert_parsed_rdb, known_paths};
use crate::engine::progress::{ProgressBar, finish_progress_bar, maybe_progress_bar, tick};
use crate::engine::tools::path_to_db_string;
use crate::ingest::{DatTask, RdbTask};
use crate::pool::{PoolHandler, PoolProgress, UnitTask};
use crate::utils::config::{DAT_FILE_FILTER, RDB_FILE_FILTER};

use super::context::{IndexReport, RunContext};
use super::error_handler::report_skipped_paths;
use super::orchestrator::process_in_batches;
use super::prune::prune;
use super::walk::discover;

type InsertFn<P> = fn(&mut Connection, &P) -> Result<()>;

struct DocumentHandler<'a, P> {
    conn: &'a mut Connection,
    insert: InsertFn<P>,
    bar: Option<ProgressBar>,
}

impl<P> PoolHandler<PathBuf, P> for DocumentHandler<'_, P> {
    fn on_complete(&mut self, progress: PoolProgress, unit_id: usize, parsed: P) -> Result<()> {
        (self.insert)(self.conn, &parsed)?;
        debug!(
            "[{}/{}] unit {unit_id} finished a document ({} running)",
            progress.finished, progress.total, progress.running
        );
        tick(self.bar.as_ref());
        Ok(())
    }

    fn on_error(&mut self, unit_id: usize, path: PathBuf, error: anyhow::Error) -> Result<()> {
        warn!("unit {unit_id}: skipping {}: {error:#}", path.display());
        tick(self.bar.as_ref());
        Ok(())
    }

    fn on_start(&mut self, unit_id: usize, path: &PathBuf) {
        debug!("unit {unit_id} <- {}", path.display());
    }

    fn on_progress(&mut self, unit_id: usize, message: &str) {
        debug!("unit {unit_id}: {message}");
    }
}

fn index_documents<T>(
    conn: &mut Connection,
    kind: CatalogKind,
    dir: &Path,
    filter: &str,
    task: T,
    insert: InsertFn<T::Output>,
    ctx: &RunContext,
) -> Result<IndexReport>
where
    T: UnitTask<Input = PathBuf>,
{
    let mut report = IndexReport::new(kind);
    report.pruned = prune(conn, kind, ctx)?;

    let walked = discover(dir, Some(filter));
    report_skipped_paths(dir, &walked.skipped);
    report.discovered = walked.found.len();

    let known = known_paths(conn, kind)?;
    let queue: Vec<PathBuf> = walked
        .found
        .into_iter()
        .map(|d| d.path)
        .filter(|p| !known.contains(&path_to_db_string(p)))
        .collect();
    report.queued = queue.len();
    info!(
        "{}: {} pruned, {} found, {} to parse",
        kind.label(),
        report.pruned,
        report.discovered,
        report.queued
    );

    let bar = maybe_progress_bar(ctx.verbose, queue.len(), "Parsing");
    let mut handler = DocumentHandler { conn, insert, bar };
    let summary = process_in_batches(task, queue, ctx, &mut handler)?;
    finish_progress_bar(handler.bar.take());
    report.completed = summary.completed;
    report.failed = summary.failed;
    Ok(report)
}

/// Bring the DAT datasets up to date with the `*.dat` files under `dir`.
pub fn index_dats(conn: &mut Connection, dir: &Path, ctx: &RunContext) -> Result<IndexReport> {
    index_documents(
        conn,
        CatalogKind::Datasets,
        dir,
        DAT_FILE_FILTER,
        DatTask,
        insert_parsed_dat,
        ctx,
    )
}

/// Bring the RDB collections up to date with the `*.rdb` files under `dir`, decoded by `tool`.
pub fn index_rdbs(
    conn: &mut Connection,
    dir: &Path,
    tool: &Path,
    ctx: &RunContext,
) -> Result<IndexReport> {
    index_documents(
        conn,
        CatalogKind::Collections,
        dir,
        RDB_FILE_FILTER,
        RdbTask {
            tool: tool.to_path_buf(),
        },
        insert_parsed_rdb,
        ctx,
    )
}
