use anyhow::Result;
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::engine::db_ops::list_entries;
use crate::engine::matching::find_fuzzy_match;
use crate::engine::progress::{finish_progress_bar, maybe_progress_bar, tick};
use crate::engine::tools::sanitize_component;
use crate::pipeline::RunContext;
use crate::FuzzyMatch;

use super::{ApplyReport, Placement, place, source_extension};

/// `<collection>/<item name><catalogued extension>`.
fn matched_target(output: &Path, source: &Path, m: &FuzzyMatch) -> PathBuf {
    let extension = source_extension(source, m.extension.as_deref());
    let file_name = sanitize_component(&format!("{}{extension}", m.item_name));
    output
        .join(sanitize_component(&m.collection_name))
        .join(file_name)
}

/// Copy every catalog entry with an RDB match into `output`. Unmatched and corrupted entries are
/// counted and left alone.
pub fn extract(conn: &Connection, output: &Path, ctx: &RunContext) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();
    let entries = list_entries(conn)?;
    let bar = maybe_progress_bar(ctx.verbose, entries.len(), "Extracting");

    for entry in entries {
        if ctx.is_cancelled() {
            info!("Interrupted: stopped extracting early");
            break;
        }
        report.total += 1;
        tick(bar.as_ref());
        if entry.corrupted.is_some() {
            report.skipped_corrupted += 1;
            continue;
        }
        let Some(m) = find_fuzzy_match(conn, &entry.filepath)? else {
            report.unknown += 1;
            continue;
        };
        let source = Path::new(&entry.filepath);
        let target = matched_target(output, source, &m);
        match place(source, &target)? {
            Placement::Copied => report.placed += 1,
            Placement::Duplicate => {
                debug!("duplicate: {} already exists", target.display());
                report.duplicates += 1;
            }
        }
    }

    finish_progress_bar(bar);
    info!(
        "Extracted {} ({} unmatched, {} duplicates, {} corrupted skipped) into {}",
        report.placed,
        report.unknown,
        report.duplicates,
        report.skipped_corrupted,
        output.display()
    );
    Ok(report)
}
