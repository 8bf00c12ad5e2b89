//! Discover phase: recursive walk producing files with full path and base name.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::tools::{file_name_of, glob_match};

/// One result from a directory walk: either a path to consider or an error with optional path.
pub enum WalkOutcome {
    Ok(walkdir::DirEntry),
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok(entry),
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// A file found by [`discover`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovered {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct DiscoverResult {
    pub found: Vec<Discovered>,
    /// Entries the walk could not read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Walk `root` recursively and collect regular files whose base name matches `filter` (all files
/// when `None`). Symlinks are not followed. Unreadable subtrees are reported in `skipped`.
pub fn discover(root: &Path, filter: Option<&str>) -> DiscoverResult {
    let iter = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .map(to_outcome);
    run_walk_loop(iter, filter)
}

/// Consume `iter` of [`WalkOutcome`], keep matching files, record errors.
/// An error without a path is recorded against the last path seen.
pub fn run_walk_loop<I>(iter: I, filter: Option<&str>) -> DiscoverResult
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut result = DiscoverResult::default();
    let mut last_path: Option<PathBuf> = None;
    for outcome in iter {
        match outcome {
            WalkOutcome::Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                let name = file_name_of(&path);
                last_path = Some(path.clone());
                if filter.is_none_or(|pattern| glob_match(pattern, &name)) {
                    result.found.push(Discovered { path, name });
                }
            }
            WalkOutcome::Err { msg, path } => {
                let to_push = path.unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "<no-path, last was {}>",
                        last_path
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "<none>".to_string())
                    ))
                });
                result.skipped.push((to_push, msg));
            }
        }
    }
    result
}
