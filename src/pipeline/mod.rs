//! Indexing pipeline: prune, discover, filter-known and process, per catalog kind.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod prune;
pub mod reference_catalog;
pub mod rom_catalog;
pub mod walk;

pub use context::{IndexReport, RunContext};
pub use error_handler::report_skipped_paths;
pub use orchestrator::process_in_batches;
pub use prune::prune;
pub use reference_catalog::{index_dats, index_rdbs};
pub use rom_catalog::{FingerprintTask, TypedFingerprintError, index_roms};
pub use walk::{DiscoverResult, Discovered, WalkOutcome, discover, run_walk_loop};
