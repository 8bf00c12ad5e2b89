use std::path::PathBuf;

/// Log paths the walk had to skip: a warning with the count, one debug line per path.
pub fn report_skipped_paths(root: &std::path::Path, skipped: &[(PathBuf, String)]) {
    if skipped.is_empty() {
        return;
    }
    log::warn!(
        "Skipped {} paths under {} due to permission errors or access issues",
        skipped.len(),
        root.display()
    );
    for (path, msg) in skipped {
        log::debug!("  skipped: {} ({})", path.display(), msg);
    }
}
