//! Action appliers: copy catalog entries into an output tree based on their reference match.
//!
//! Both appliers walk the catalog one entry at a time. An existing target is never overwritten and
//! counts as a duplicate, so a second run over the same output copies nothing.

mod extractor;
mod sorter;

pub use extractor::extract;
pub use sorter::sort;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::tools::{dotted_extension, path_relative_to};

/// Counts of one applier run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Matched entries copied to their reference location.
    pub placed: usize,
    /// Targets that already existed (not overwritten).
    pub duplicates: usize,
    /// Unmatched entries copied to the unknown bucket (sorter) or left alone (extractor).
    pub unknown: usize,
    pub skipped_corrupted: usize,
    /// Catalog entries visited.
    pub total: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Copied,
    Duplicate,
}

/// Copy `source` to `target` unless `target` exists. Parent directories are created.
pub(crate) fn place(source: &Path, target: &Path) -> Result<Placement> {
    if target
        .try_exists()
        .with_context(|| format!("check target {}", target.display()))?
    {
        return Ok(Placement::Duplicate);
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::copy(source, target).with_context(|| {
        format!("copy {} to {}", source.display(), target.display())
    })?;
    Ok(Placement::Copied)
}

/// `source` relative to the first input root containing it, else its file name.
pub(crate) fn relative_to_roots(source: &Path, roots: &[PathBuf]) -> PathBuf {
    roots
        .iter()
        .find_map(|root| path_relative_to(source, root))
        .filter(|rel| !rel.as_os_str().is_empty())
        .or_else(|| source.file_name().map(PathBuf::from))
        .unwrap_or_else(|| source.to_path_buf())
}

/// Extension recorded at indexing time; the path's own only when none was recorded.
pub(crate) fn source_extension(source: &Path, catalogued: Option<&str>) -> String {
    catalogued.map_or_else(|| dotted_extension(source), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_uses_matching_root() {
        let roots = vec![PathBuf::from("/a"), PathBuf::from("/roms")];
        assert_eq!(
            relative_to_roots(Path::new("/roms/gb/x.gb"), &roots),
            PathBuf::from("gb/x.gb")
        );
        assert_eq!(
            relative_to_roots(Path::new("/elsewhere/y.gb"), &roots),
            PathBuf::from("y.gb")
        );
    }

    #[test]
    fn catalogued_extension_wins() {
        let source = Path::new("/roms/game.bin");
        assert_eq!(source_extension(source, Some(".zip")), ".zip");
        assert_eq!(source_extension(source, None), ".bin");
    }

    #[test]
    fn place_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.bin");
        fs::write(&source, b"new").unwrap();
        let target = dir.path().join("out/deep/t.bin");
        assert_eq!(place(&source, &target).unwrap(), Placement::Copied);
        fs::write(&target, b"old").unwrap();
        assert_eq!(place(&source, &target).unwrap(), Placement::Duplicate);
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }
}
