//! Command handlers for sort, extract, cleandb and index

use anyhow::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::apply::{extract, sort};
use crate::engine::arg_parser::{Cli, Commands, CommonArgs};
use crate::engine::tools::readable_dir;
use crate::index::{Session, Sources, cancel_flag};
use crate::utils::config::PoolConsts;
use crate::utils::romcat_toml::{apply_file_to_opts, load_romcat_toml};
use crate::utils::setup_logging;

/// Build Opts: defaults, then `.romcat.toml` in the working directory, then CLI flags.
fn resolve_opts(storage: Option<&PathBuf>, pool_size: Option<usize>, verbose: Option<bool>) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_romcat_toml(Path::new(".")) {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(path) = storage {
        opts.storage = Some(path.clone());
    }
    if let Some(n) = pool_size {
        opts.pool_size = n.clamp(1, PoolConsts::MAX_POOL_SIZE);
    }
    if let Some(v) = verbose {
        opts.verbose = v;
    }
    opts
}

/// Setup logging and create Opts from CommonArgs
fn setup_operation(common: &CommonArgs) -> Opts {
    let opts = resolve_opts(common.storage.as_ref(), common.pool_size, common.verbose);
    setup_logging(opts.verbose);
    opts
}

fn canonical_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    inputs
        .iter()
        .map(|p| readable_dir(p, "input directory"))
        .collect()
}

/// The output directory must not exist; it is created empty.
fn create_output_dir(output: &Path) -> Result<PathBuf> {
    if output.exists() {
        bail!("output directory {} already exists", output.display());
    }
    fs::create_dir_all(output)
        .with_context(|| format!("create output directory {}", output.display()))?;
    output
        .canonicalize()
        .with_context(|| format!("canonicalize {}", output.display()))
}

fn decoder_tool(tool: &Path) -> Result<PathBuf> {
    if !tool.is_file() {
        bail!("decoder tool {} does not exist", tool.display());
    }
    tool.canonicalize()
        .with_context(|| format!("canonicalize {}", tool.display()))
}

/// Handle sort command
pub fn handle_sort(datasets: &Path, output: &Path, common: &CommonArgs) -> Result<()> {
    let opts = setup_operation(common);
    let inputs = canonical_inputs(&common.inputs)?;
    let datasets = readable_dir(datasets, "dataset directory")?;
    let output = create_output_dir(output)?;

    let mut session = Session::open(&opts, cancel_flag())?;
    let sources = Sources {
        dat_dir: Some(datasets.as_path()),
        rdb: None,
    };
    session.index(&inputs, sources)?;
    session.save()?;
    sort(&session.conn, &inputs, &output, &session.ctx)?;
    Ok(())
}

/// Handle extract command
pub fn handle_extract(rdbs: &Path, tool: &Path, output: &Path, common: &CommonArgs) -> Result<()> {
    let opts = setup_operation(common);
    let inputs = canonical_inputs(&common.inputs)?;
    let rdbs = readable_dir(rdbs, "RDB directory")?;
    let tool = decoder_tool(tool)?;
    let output = create_output_dir(output)?;

    let mut session = Session::open(&opts, cancel_flag())?;
    let sources = Sources {
        dat_dir: None,
        rdb: Some((rdbs.as_path(), tool.as_path())),
    };
    session.index(&inputs, sources)?;
    session.save()?;
    extract(&session.conn, &output, &session.ctx)?;
    Ok(())
}

/// Handle cleandb command: load, prune vanished files, save back to the same file.
pub fn handle_cleandb(storage: &Path, verbose: Option<bool>) -> Result<()> {
    let opts = resolve_opts(Some(&storage.to_path_buf()), None, verbose);
    setup_logging(opts.verbose);
    fs::File::open(storage)
        .with_context(|| format!("catalog {} is not readable", storage.display()))?;

    let mut session = Session::open(&opts, cancel_flag())?;
    let removed = session.prune_files()?;
    info!("Removed {removed} entries for missing files");
    session.save()?;
    let stats = session.stats()?;
    info!(
        "Catalog now holds {} files ({} zipped, {} corrupted)",
        stats.files, stats.files_zipped, stats.files_corrupted
    );
    Ok(())
}

/// Handle index command
pub fn handle_index(datasets: Option<&Path>, common: &CommonArgs) -> Result<()> {
    let opts = setup_operation(common);
    let inputs = canonical_inputs(&common.inputs)?;
    let datasets = datasets
        .map(|d| readable_dir(d, "dataset directory"))
        .transpose()?;

    let mut session = Session::open(&opts, cancel_flag())?;
    let sources = Sources {
        dat_dir: datasets.as_deref(),
        rdb: None,
    };
    session.index(&inputs, sources)?;
    session.save()?;
    Ok(())
}

/// Dispatch the parsed command line.
pub fn handle_run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Sort {
            datasets,
            output,
            common,
        } => handle_sort(datasets, output, common),
        Commands::Extract {
            rdbs,
            tool,
            output,
            common,
        } => handle_extract(rdbs, tool, output, common),
        Commands::Cleandb { storage, verbose } => handle_cleandb(storage, *verbose),
        Commands::Index { datasets, common } => handle_index(datasets.as_deref(), common),
    }
}
