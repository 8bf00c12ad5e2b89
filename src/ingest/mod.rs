//! Reference-format ingestion, run inside pool units.

pub mod dat;
pub mod rdb;

use anyhow::Result;
use std::path::PathBuf;

use crate::pool::{ProgressReporter, UnitTask};
use crate::{ParsedDat, ParsedRdb};

pub use dat::{DatSink, parse_dat, parse_dat_file};
pub use rdb::{parse_listing, read_rdb_file};

/// Parses one DAT document per item.
pub struct DatTask;

impl UnitTask for DatTask {
    type Input = PathBuf;
    type Output = ParsedDat;

    fn execute(&self, path: PathBuf, progress: &ProgressReporter) -> Result<ParsedDat> {
        progress.report(format!("parsing {}", path.display()));
        parse_dat_file(&path)
    }
}

/// Decodes one RDB file per item with the configured tool.
pub struct RdbTask {
    pub tool: PathBuf,
}

impl UnitTask for RdbTask {
    type Input = PathBuf;
    type Output = ParsedRdb;

    fn execute(&self, path: PathBuf, progress: &ProgressReporter) -> Result<ParsedRdb> {
        progress.report(format!("decoding {}", path.display()));
        read_rdb_file(&self.tool, &path)
    }
}
