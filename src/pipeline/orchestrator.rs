//! Process phase driver shared by the three indexers.

use anyhow::Result;
use log::{debug, info};

use crate::pool::{PoolHandler, RunSummary, UnitTask, WorkerPool};
use crate::utils::config::INDEX_BATCH_SIZE;

use super::context::RunContext;

/// Run `items` through a pool of `task` units in batches of [`INDEX_BATCH_SIZE`].
///
/// The pool is sized to `min(pool_size, items)`. Between batches the cancel flag is checked;
/// once set, no further batch is submitted and the totals so far are returned.
pub fn process_in_batches<T: UnitTask>(
    task: T,
    items: Vec<T::Input>,
    ctx: &RunContext,
    handler: &mut dyn PoolHandler<T::Input, T::Output>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    if items.is_empty() {
        return Ok(summary);
    }
    let mut pool = WorkerPool::initialize(ctx.pool_size.min(items.len()), task)?;
    debug!("processing {} items on {} units", items.len(), pool.size());

    let mut items = items.into_iter();
    loop {
        if ctx.is_cancelled() {
            info!("Interrupted: not submitting further work");
            break;
        }
        let batch: Vec<T::Input> = items.by_ref().take(INDEX_BATCH_SIZE).collect();
        if batch.is_empty() {
            break;
        }
        let done = pool.run(batch, handler)?;
        summary.total += done.total;
        summary.completed += done.completed;
        summary.failed += done.failed;
    }

    pool.finalize()?;
    Ok(summary)
}
