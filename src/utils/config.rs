//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    temp_suffix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                temp_suffix: format!("{pkg}.tmp"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Name of the optional settings file looked up in the working directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Suffix appended to a snapshot path while it is being written.
    pub fn temp_suffix(&self) -> &str {
        &self.temp_suffix
    }
}

// ---- Worker pool ----

/// Pool sizing.
pub struct PoolConsts;

impl PoolConsts {
    /// Units spawned when neither CLI nor settings file choose a size.
    pub const DEFAULT_POOL_SIZE: usize = 4;
    /// Upper bound accepted from user input.
    pub const MAX_POOL_SIZE: usize = 64;
}

// ---- Fingerprinting ----

/// Fingerprinting I/O.
pub struct HashingConsts;

impl HashingConsts {
    /// Chunk size for streamed reads fed to all three hashers (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

/// MIME type of the archive container that is fingerprinted by its first entry.
pub const ARCHIVE_MIME: &str = "application/zip";

/// MIME type used when magic-byte sniffing finds nothing.
pub const FALLBACK_MIME: &str = "application/octet-stream";

// ---- Reference datasets ----

/// Filename filter for archive-description documents.
pub const DAT_FILE_FILTER: &str = "*.dat";

/// Filename filter for binary reference databases.
pub const RDB_FILE_FILTER: &str = "*.rdb";

/// Argument passed to the external decoder tool after the document path.
pub const RDB_TOOL_LIST_ARG: &str = "list";

// ---- Appliers ----

/// Bucket for catalog entries without a reference match (sorter only).
pub const UNKNOWN_BUCKET: &str = "__UNKNOWN__";

// ---- Database ----

/// Snapshot transfer batch size as a multiple of the store's page size.
pub const TRANSFER_PAGE_MULTIPLIER: i64 = 2;

// ---- Indexing ----

/// Items handed to the worker pool per run. The cancel flag is checked between batches.
pub const INDEX_BATCH_SIZE: usize = 1_000;
