//! Load `.romcat.toml` from a directory (CLI only). Lib callers build [`Opts`](crate::Opts) themselves.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::{PackagePaths, PoolConsts};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RomcatToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    storage: Option<String>,
    pool_size: Option<usize>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub(crate) fn load_romcat_toml(dir: &Path) -> Option<RomcatToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_romcat_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_romcat_toml(s: &str) -> Result<RomcatToml, toml::de::Error> {
    toml::from_str(s)
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &RomcatToml, opts: &mut Opts) {
    let s = &file.settings;
    if let Some(ref p) = s.storage {
        opts.storage = Some(PathBuf::from(p));
    }
    if let Some(n) = s.pool_size {
        opts.pool_size = n.clamp(1, PoolConsts::MAX_POOL_SIZE);
    }
    if let Some(v) = s.verbose {
        opts.verbose = v;
    }
}
