use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

/// Temporary path a snapshot is written to before the final rename.
pub fn temp_path_for(snapshot_path: &Path) -> PathBuf {
    let name = snapshot_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PackagePaths::get().pkg_name().to_string());
    snapshot_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{name}.{}", PackagePaths::get().temp_suffix()))
}

/// Remove SQLite journal / WAL / SHM files that may sit next to `db_path`.
pub fn remove_sqlite_sidecars(db_path: &Path) {
    let file_name = db_path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let parent = db_path.parent().unwrap_or(Path::new("."));
    for suffix in ["-journal", "-wal", "-shm"] {
        let _ = fs::remove_file(parent.join(format!("{file_name}{suffix}")));
    }
}

/// Prepare a fresh temp path for writing a snapshot: removes a stale temp file and its sidecars.
pub fn prepare_snapshot_work_path(snapshot_path: &Path) -> Result<PathBuf> {
    let temp_path = temp_path_for(snapshot_path);
    if temp_path.exists() {
        remove_sqlite_sidecars(&temp_path);
        fs::remove_file(&temp_path).with_context(|| {
            format!("remove stale temp snapshot at {}", temp_path.display())
        })?;
    }
    Ok(temp_path)
}

pub fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "atomic rename temp snapshot to final path ({} -> {})",
            temp_path.display(),
            final_path.display()
        )
    })?;
    remove_sqlite_sidecars(temp_path);
    Ok(())
}
