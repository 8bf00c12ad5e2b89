//! Run context shared by the indexers, and their per-kind report.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Opts;
use crate::engine::db_ops::CatalogKind;

/// Settings and the cancel flag every indexing phase consults.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub pool_size: usize,
    /// Render progress bars for pool phases.
    pub verbose: bool,
    /// Set by the Ctrl-C handler; sequential loops stop between items, indexers between batches.
    pub cancel: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new(opts: &Opts, cancel: Arc<AtomicBool>) -> Self {
        Self {
            pool_size: opts.pool_size.max(1),
            verbose: opts.verbose,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// What one indexer run did for one catalog kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexReport {
    pub kind: CatalogKind,
    /// Stored source paths removed because they no longer exist.
    pub pruned: usize,
    /// Paths found by the walk.
    pub discovered: usize,
    /// Paths not yet known, handed to the pool.
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
}

impl IndexReport {
    pub fn new(kind: CatalogKind) -> Self {
        Self {
            kind,
            pruned: 0,
            discovered: 0,
            queued: 0,
            completed: 0,
            failed: 0,
        }
    }
}
