pub mod config;
pub mod logger;
pub(crate) mod romcat_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::setup_logging;
pub use tempfiles::{prepare_snapshot_work_path, rename_temp_to_final, temp_path_for};
