//! romcat: content-addressable ROM catalog with DAT / RDB matching

pub mod apply;
pub mod engine;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod pool;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use apply::ApplyReport;
pub use index::{Session, Sources};

/// Result alias used by public romcat API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
