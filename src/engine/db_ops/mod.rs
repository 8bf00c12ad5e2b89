//! Database operations: schema, open, catalog and reference rows, snapshot transfer, stats.

mod catalog;
mod connection;
mod reference;
mod stats;
mod transfer;

pub use catalog::{
    get_entry, known_paths, list_entries, mark_corrupted, recorded_paths, remove_path,
    upsert_fingerprint,
};
pub use connection::{open_db, open_db_in_memory};
pub use reference::{insert_parsed_dat, insert_parsed_rdb};
pub use stats::storage_stats;
pub use transfer::{load_from, save_to};

/// The three independently indexed populations. Each is keyed by a unique source path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogKind {
    /// ROM files (`catalog` table).
    Files,
    /// Archive-description documents (`datasets` table, cascades to entries and candidates).
    Datasets,
    /// Binary reference databases (`collections` table, cascades to items).
    Collections,
}

impl CatalogKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            CatalogKind::Files => "catalog",
            CatalogKind::Datasets => "datasets",
            CatalogKind::Collections => "collections",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Files => "files",
            CatalogKind::Datasets => "DAT documents",
            CatalogKind::Collections => "RDB documents",
        }
    }
}

/// Connection pragmas applied on every open. Cascades depend on `foreign_keys`.
pub(crate) const CONNECTION_PRAGMAS: &str = r#"
        PRAGMA foreign_keys = ON;
        PRAGMA synchronous = NORMAL;
        "#;

pub(crate) const UPSERT_FINGERPRINT_SQL: &str = r#"
INSERT INTO catalog (filepath, extension, mimetype, size, sha1, md5, crc32, corrupted)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
ON CONFLICT(filepath) DO UPDATE SET
    extension = excluded.extension,
    mimetype = excluded.mimetype,
    size = excluded.size,
    sha1 = excluded.sha1,
    md5 = excluded.md5,
    crc32 = excluded.crc32,
    corrupted = NULL
"#;

pub(crate) const UPSERT_CORRUPTED_SQL: &str = r#"
INSERT INTO catalog (filepath, extension, mimetype, corrupted)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(filepath) DO UPDATE SET
    extension = COALESCE(excluded.extension, catalog.extension),
    mimetype = COALESCE(excluded.mimetype, catalog.mimetype),
    corrupted = excluded.corrupted
"#;

pub(crate) const INSERT_DATASET_SQL: &str = "INSERT INTO datasets \
    (filepath, name, description, category, version, author, email, homepage, url) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

pub(crate) const INSERT_DATASET_ENTRY_SQL: &str =
    "INSERT INTO dataset_entries (dataset_id, name, description) VALUES (?1, ?2, ?3)";

pub(crate) const INSERT_CANDIDATE_SQL: &str = "INSERT INTO candidates \
    (entry_id, name, size, sha1, md5, crc32) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

pub(crate) const INSERT_COLLECTION_SQL: &str =
    "INSERT INTO collections (filepath, name) VALUES (?1, ?2)";

pub(crate) const INSERT_ITEM_SQL: &str = "INSERT INTO items \
    (collection_id, name, sha1, md5, crc32, size) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// Column lists per table, parents before children. Snapshot transfer copies tables in this
/// order with ids preserved so foreign keys stay valid.
pub(crate) const TABLE_COLUMNS: &[(&str, &str)] = &[
    (
        "catalog",
        "id, filepath, extension, mimetype, size, sha1, md5, crc32, corrupted",
    ),
    (
        "datasets",
        "id, filepath, name, description, category, version, author, email, homepage, url",
    ),
    ("dataset_entries", "id, dataset_id, name, description"),
    ("candidates", "id, entry_id, name, size, sha1, md5, crc32"),
    ("collections", "id, filepath, name"),
    ("items", "id, collection_id, name, sha1, md5, crc32, size"),
];

/// Schema for the catalog and both reference hierarchies.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS catalog (
    id INTEGER PRIMARY KEY,
    filepath TEXT NOT NULL UNIQUE,
    extension TEXT,
    mimetype TEXT,
    size INTEGER,
    sha1 BLOB,
    md5 BLOB,
    crc32 BLOB,
    corrupted TEXT
);
CREATE INDEX IF NOT EXISTS idx_catalog_hashes ON catalog(sha1, md5, crc32);

CREATE TABLE IF NOT EXISTS datasets (
    id INTEGER PRIMARY KEY,
    filepath TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    version TEXT NOT NULL,
    author TEXT,
    email TEXT,
    homepage TEXT,
    url TEXT
);

CREATE TABLE IF NOT EXISTS dataset_entries (
    id INTEGER PRIMARY KEY,
    dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dataset_entries_dataset ON dataset_entries(dataset_id);

CREATE TABLE IF NOT EXISTS candidates (
    id INTEGER PRIMARY KEY,
    entry_id INTEGER NOT NULL REFERENCES dataset_entries(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    sha1 BLOB NOT NULL,
    md5 BLOB NOT NULL,
    crc32 BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_candidates_hashes ON candidates(sha1, md5, crc32);
CREATE INDEX IF NOT EXISTS idx_candidates_entry ON candidates(entry_id);

CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY,
    filepath TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    sha1 BLOB,
    md5 BLOB,
    crc32 BLOB,
    size INTEGER
);
CREATE INDEX IF NOT EXISTS idx_items_sha1 ON items(sha1);
CREATE INDEX IF NOT EXISTS idx_items_md5_crc32_size ON items(md5, crc32, size);
CREATE INDEX IF NOT EXISTS idx_items_collection ON items(collection_id);
"#;
