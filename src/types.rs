//! Public and internal types for the romcat catalog, reference datasets and matching.

use std::path::PathBuf;

use crate::utils::config::PoolConsts;

/// Content fingerprint of one file: three digests plus the byte count they cover.
///
/// Digests are raw bytes (`sha1` 20, `md5` 16, `crc32` 4 big-endian), the same shape as the
/// BLOB columns in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub sha1: Vec<u8>,
    pub md5: Vec<u8>,
    pub crc32: Vec<u8>,
    pub size: u64,
}

/// One tracked file (a row of the `catalog` table).
///
/// Hash fields and `size` stay `None` until the file is fingerprinted. A `Some` in
/// `corrupted` freezes the entry out of fingerprinting and matching.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    pub filepath: String,
    pub extension: Option<String>,
    pub mimetype: Option<String>,
    pub size: Option<u64>,
    pub sha1: Option<Vec<u8>>,
    pub md5: Option<Vec<u8>>,
    pub crc32: Option<Vec<u8>>,
    pub corrupted: Option<String>,
}

impl CatalogEntry {
    /// All three digests recorded.
    pub fn is_fingerprinted(&self) -> bool {
        self.sha1.is_some() && self.md5.is_some() && self.crc32.is_some()
    }

    /// The fingerprint, when all of its parts are present.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        Some(Fingerprint {
            sha1: self.sha1.clone()?,
            md5: self.md5.clone()?,
            crc32: self.crc32.clone()?,
            size: self.size?,
        })
    }
}

/// Output of one fingerprinting unit run: what the indexer upserts into the catalog.
#[derive(Clone, Debug)]
pub struct FingerprintedFile {
    pub filepath: String,
    pub extension: String,
    pub mimetype: String,
    pub fingerprint: Fingerprint,
}

// ---- ReferenceDataset A (archive-description documents) ----

/// Root of one archive-description document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Source document path (unique).
    pub filepath: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub version: String,
    pub author: Option<String>,
    pub email: Option<String>,
    pub homepage: Option<String>,
    pub url: Option<String>,
}

/// Top-level element of a dataset (a game / machine).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetEntry {
    /// Index into [`ParsedDat::datasets`] until persisted.
    pub dataset: usize,
    pub name: String,
    pub description: String,
}

/// One described file of an entry. Only built when all three digests are present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Index into [`ParsedDat::entries`] until persisted.
    pub entry: usize,
    pub name: String,
    pub size: u64,
    pub sha1: Vec<u8>,
    pub md5: Vec<u8>,
    pub crc32: Vec<u8>,
}

/// Everything one document produced, in emission order. Parent references are zero-based
/// indices local to this batch; the store remaps them to row ids on insert.
#[derive(Clone, Debug, Default)]
pub struct ParsedDat {
    pub filepath: String,
    pub datasets: Vec<Dataset>,
    pub entries: Vec<DatasetEntry>,
    pub candidates: Vec<Candidate>,
}

// ---- ReferenceDataset B (binary reference databases) ----

/// Root of one binary reference database.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    /// Source file path (unique).
    pub filepath: String,
    /// Display name (file stem).
    pub name: String,
}

/// One record of a collection. `None` means "not recorded", which matching treats as a wildcard
/// only when `sha1` is present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Item {
    /// Index into [`ParsedRdb::collections`] until persisted.
    pub collection: usize,
    pub name: String,
    pub sha1: Option<Vec<u8>>,
    pub md5: Option<Vec<u8>>,
    pub crc32: Option<Vec<u8>>,
    pub size: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct ParsedRdb {
    pub filepath: String,
    pub collections: Vec<Collection>,
    pub items: Vec<Item>,
}

// ---- Match results (ephemeral) ----

/// Catalog entry joined to the first exactly matching [`Candidate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExactMatch {
    pub filepath: String,
    pub extension: Option<String>,
    pub mimetype: Option<String>,
    pub dataset_filepath: String,
    pub dataset_name: String,
    pub dataset_description: Option<String>,
    pub dataset_category: String,
    pub entry_name: String,
    pub entry_description: String,
    pub candidate_name: String,
}

/// Catalog entry joined to the first fuzzily matching [`Item`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub filepath: String,
    pub extension: Option<String>,
    pub mimetype: Option<String>,
    pub collection_filepath: String,
    pub collection_name: String,
    pub item_name: String,
}

/// Row counts across the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub files: usize,
    pub files_zipped: usize,
    pub files_corrupted: usize,
    pub datasets: usize,
    pub dataset_entries: usize,
    pub candidates: usize,
    pub collections: usize,
    pub items: usize,
}

// ---- Options ----

/// Run options shared by all subcommands.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Snapshot file to load before and save after indexing.
    pub storage: Option<PathBuf>,
    /// Worker pool size for the process phase.
    pub pool_size: usize,
    /// Debug logging and progress bars.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            storage: None,
            pool_size: PoolConsts::DEFAULT_POOL_SIZE,
            verbose: false,
        }
    }
}
