//! Engine module: store, fingerprinting, matching and the CLI surface

pub mod arg_parser;
pub mod db_ops;
pub mod handlers;
pub mod hashing;
pub mod matching;
pub mod mime;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands, CommonArgs};
pub use db_ops::{CatalogKind, load_from, open_db, open_db_in_memory, save_to, storage_stats};
pub use handlers::handle_run;
pub use hashing::{FingerprintError, fingerprint};
pub use matching::{exact_matches, find_exact_match, find_fuzzy_match, fuzzy_matches};
pub use tools::path_relative_to;
