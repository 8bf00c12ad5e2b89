//! Prune phase: drop stored source paths whose file is gone.

use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use rusqlite::Connection;
use std::path::Path;

use crate::engine::db_ops::{CatalogKind, recorded_paths, remove_path};

use super::context::RunContext;

/// Check every recorded path of `kind` and delete the ones that no longer exist, cascading to
/// their children. Liveness checks run in parallel; deletes run one at a time. An I/O error while
/// checking liveness is fatal. Returns the number of removed paths.
pub fn prune(conn: &Connection, kind: CatalogKind, ctx: &RunContext) -> Result<usize> {
    let recorded = recorded_paths(conn, kind)?;
    let checked: Vec<Option<&String>> = recorded
        .par_iter()
        .map(|p| {
            Path::new(p)
                .try_exists()
                .map(|alive| (!alive).then_some(p))
                .with_context(|| format!("check whether {p} still exists"))
        })
        .collect::<Result<_>>()?;

    let mut removed = 0;
    for path in checked.into_iter().flatten() {
        if ctx.is_cancelled() {
            info!("Interrupted: stopped pruning {} early", kind.label());
            break;
        }
        remove_path(conn, kind, path)?;
        debug!("pruned {path}");
        removed += 1;
    }
    Ok(removed)
}
