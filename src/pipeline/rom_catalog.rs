//! ROM file indexer: prune, discover, filter-known, fingerprint in the pool.

use anyhow::Result;
use log::{debug, info, warn};
use rusqlite::Connection;
use std::path::PathBuf;
use thiserror::Error;

use crate::engine::db_ops::{CatalogKind, known_paths, mark_corrupted, upsert_fingerprint};
use crate::engine::hashing::{FingerprintError, fingerprint};
use crate::engine::mime;
use crate::engine::progress::{ProgressBar, finish_progress_bar, maybe_progress_bar, tick};
use crate::engine::tools::{dotted_extension, path_to_db_string};
use crate::pool::{PoolHandler, PoolProgress, ProgressReporter, UnitTask};
use crate::FingerprintedFile;

use super::context::{IndexReport, RunContext};
use super::error_handler::report_skipped_paths;
use super::orchestrator::process_in_batches;
use super::prune::prune;
use super::walk::discover;

/// Resolves the content type and fingerprints one file per item.
pub struct FingerprintTask;

/// A fingerprint failure after the content type was already resolved, so the corrupted row
/// still records what the file is.
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct TypedFingerprintError {
    pub extension: String,
    pub mimetype: String,
    pub cause: FingerprintError,
}

impl UnitTask for FingerprintTask {
    type Input = PathBuf;
    type Output = FingerprintedFile;

    fn execute(&self, path: PathBuf, progress: &ProgressReporter) -> Result<FingerprintedFile> {
        progress.report(format!("hashing {}", path.display()));
        let (extension, mimetype) =
            mime::resolve(&path).map_err(|e| FingerprintError::Unreadable {
                path: path.display().to_string(),
                reason: format!("{e:#}"),
            })?;
        let fingerprint =
            fingerprint(&path, &mimetype).map_err(|cause| TypedFingerprintError {
                extension: extension.clone(),
                mimetype: mimetype.clone(),
                cause,
            })?;
        Ok(FingerprintedFile {
            filepath: path_to_db_string(&path),
            extension,
            mimetype,
            fingerprint,
        })
    }
}

/// Persists each result as it arrives; failures become `corrupted` rows.
struct RomHandler<'a> {
    conn: &'a Connection,
    bar: Option<ProgressBar>,
}

impl PoolHandler<PathBuf, FingerprintedFile> for RomHandler<'_> {
    fn on_complete(
        &mut self,
        progress: PoolProgress,
        unit_id: usize,
        output: FingerprintedFile,
    ) -> Result<()> {
        upsert_fingerprint(self.conn, &output)?;
        debug!(
            "[{}/{}] unit {unit_id} hashed {} ({} running)",
            progress.finished, progress.total, output.filepath, progress.running
        );
        tick(self.bar.as_ref());
        Ok(())
    }

    fn on_error(&mut self, unit_id: usize, path: PathBuf, error: anyhow::Error) -> Result<()> {
        let reason = format!("{error:#}");
        warn!("unit {unit_id}: {} marked corrupted: {reason}", path.display());
        // Panics and unreadable files never got a sniffed type; fall back to the path.
        let (extension, mimetype) = match error.downcast_ref::<TypedFingerprintError>() {
            Some(typed) => (typed.extension.clone(), Some(typed.mimetype.as_str())),
            None => (dotted_extension(&path), None),
        };
        mark_corrupted(
            self.conn,
            &path_to_db_string(&path),
            (!extension.is_empty()).then_some(extension.as_str()),
            mimetype,
            &reason,
        )?;
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

/// Bring the catalog up to date with the files under `roots`.
pub fn index_roms(conn: &Connection, roots: &[PathBuf], ctx: &RunContext) -> Result<IndexReport> {
    let kind = CatalogKind::Files;
    let mut report = IndexReport::new(kind);

    report.pruned = prune(conn, kind, ctx)?;

    let mut found = Vec::new();
    for root in roots {
        let walked = discover(root, None);
        report_skipped_paths(root, &walked.skipped);
        found.extend(walked.found);
    }
    report.discovered = found.len();

    let known = known_paths(conn, kind)?;
    let queue: Vec<PathBuf> = found
        .into_iter()
        .map(|d| d.path)
        .filter(|p| !known.contains(&path_to_db_string(p)))
        .collect();
    report.queued = queue.len();
    info!(
        "Files: {} pruned, {} found, {} to fingerprint",
        report.pruned, report.discovered, report.queued
    );

    let mut handler = RomHandler {
        conn,
        bar: maybe_progress_bar(ctx.verbose, queue.len(), "Fingerprinting"),
    };
    let summary = process_in_batches(FingerprintTask, queue, ctx, &mut handler)?;
    finish_progress_bar(handler.bar.take());
    report.completed = summary.completed;
    report.failed = summary.failed;
    Ok(report)
}
