//! Progress bar utilities for displaying processing status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a progress bar for `total` items.
pub fn create_progress_bar(total: usize, desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = total,
        desc = desc,
        animation = Animation::Classic
    )))
}

/// A bar only when `enabled` (verbose runs) and there is something to count.
pub fn maybe_progress_bar(enabled: bool, total: usize, desc: &'static str) -> Option<ProgressBar> {
    (enabled && total > 0).then(|| create_progress_bar(total, desc))
}

/// Update progress bar if available
/// Uses try_lock to avoid blocking if mutex is contended (non-blocking)
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Advance an optional bar by one.
pub fn tick(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        update_progress_bar(pb, 1);
    }
}

/// Finish the bar line so following log output starts on a fresh line.
pub fn finish_progress_bar(pb: Option<ProgressBar>) {
    if let Some(pb) = pb
        && let Ok(mut bar) = pb.lock()
    {
        let _ = bar.refresh();
        eprintln!();
    }
}
