use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Catalog a ROM collection and sort or extract it against reference datasets.
#[derive(Clone, Parser)]
#[command(name = "romcat", version)]
#[command(about = "Fingerprint ROM files, match them against DAT / RDB references, then sort or extract.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Index inputs and DAT files, then copy each file under <OUTPUT>/<dataset>/ by exact match.
    Sort {
        /// Directory containing archive-description (*.dat) files.
        #[arg(long, short = 't', value_name = "DIR")]
        datasets: PathBuf,

        /// Output directory. Must not exist yet.
        #[arg(long, short = 'o', value_name = "DIR")]
        output: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Index inputs and RDB files, then copy each matched file under <OUTPUT>/<collection>/.
    Extract {
        /// Directory containing binary reference databases (*.rdb).
        #[arg(long, short = 'r', value_name = "DIR")]
        rdbs: PathBuf,

        /// Decoder tool invoked as `<TOOL> <file.rdb> list`.
        #[arg(long, short = 't', value_name = "TOOL")]
        tool: PathBuf,

        /// Output directory. Must not exist yet.
        #[arg(long, short = 'o', value_name = "DIR")]
        output: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Remove entries for vanished files from a catalog snapshot.
    Cleandb {
        /// Snapshot file written by a previous run with --storage.
        #[arg(value_name = "FILE")]
        storage: PathBuf,

        /// Verbose output.
        #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
        verbose: Option<bool>,
    },

    /// Index inputs (and optionally DAT files) without copying anything.
    Index {
        /// Directory containing archive-description (*.dat) files.
        #[arg(long, short = 't', value_name = "DIR")]
        datasets: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Flags shared by the indexing subcommands. Unset values fall back to `.romcat.toml`, then defaults.
#[derive(Clone, Args)]
pub struct CommonArgs {
    /// Input directories to catalog.
    #[arg(value_name = "INPUT", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Catalog snapshot to load before and save after indexing.
    #[arg(long, short = 's', value_name = "FILE")]
    pub storage: Option<PathBuf>,

    /// Number of worker units for fingerprinting and parsing.
    #[arg(long, short = 'p', value_parser = clap::value_parser!(usize))]
    pub pool_size: Option<usize>,

    /// Verbose output (debug logging and progress bars).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
