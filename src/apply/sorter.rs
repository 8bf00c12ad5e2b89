use anyhow::Result;
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::engine::db_ops::list_entries;
use crate::engine::matching::find_exact_match;
use crate::engine::progress::{finish_progress_bar, maybe_progress_bar, tick};
use crate::engine::tools::{dotted_extension, file_stem_of, sanitize_component};
use crate::pipeline::RunContext;
use crate::utils::config::{ARCHIVE_MIME, UNKNOWN_BUCKET};
use crate::ExactMatch;

use super::{ApplyReport, Placement, place, relative_to_roots, source_extension};

/// `<dataset>/<candidate stem><ext>`: the candidate's extension, or the catalogued extension
/// when the source is a zip container.
fn matched_target(output: &Path, source: &Path, m: &ExactMatch) -> PathBuf {
    let candidate = Path::new(&m.candidate_name);
    let extension = if m.mimetype.as_deref() == Some(ARCHIVE_MIME) {
        source_extension(source, m.extension.as_deref())
    } else {
        dotted_extension(candidate)
    };
    let file_name = sanitize_component(&format!("{}{extension}", file_stem_of(candidate)));
    output
        .join(sanitize_component(&m.dataset_name))
        .join(file_name)
}

/// Copy every catalog entry into `output` by its DAT match. Unmatched entries go to the unknown
/// bucket under their path relative to the input root; corrupted entries are skipped.
pub fn sort(
    conn: &Connection,
    roots: &[PathBuf],
    output: &Path,
    ctx: &RunContext,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();
    let entries = list_entries(conn)?;
    let bar = maybe_progress_bar(ctx.verbose, entries.len(), "Sorting");

    for entry in entries {
        if ctx.is_cancelled() {
            info!("Interrupted: stopped sorting early");
            break;
        }
        report.total += 1;
        tick(bar.as_ref());
        if entry.corrupted.is_some() {
            report.skipped_corrupted += 1;
            continue;
        }
        let source = Path::new(&entry.filepath);
        let matched = find_exact_match(conn, &entry.filepath)?;
        let target = match &matched {
            Some(m) => matched_target(output, source, m),
            None => output
                .join(UNKNOWN_BUCKET)
                .join(relative_to_roots(source, roots)),
        };
        match place(source, &target)? {
            Placement::Duplicate => {
                debug!("duplicate: {} already exists", target.display());
                report.duplicates += 1;
            }
            Placement::Copied if matched.is_some() => report.placed += 1,
            Placement::Copied => report.unknown += 1,
        }
    }

    finish_progress_bar(bar);
    info!(
        "Sorted {} ({} unknown, {} duplicates, {} corrupted skipped) into {}",
        report.placed,
        report.unknown,
        report.duplicates,
        report.skipped_corrupted,
        output.display()
    );
    Ok(report)
}
