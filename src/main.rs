//! romcat CLI: sort, extract, cleandb, index.

use clap::Parser;
use colored::Colorize;
use romcat::engine::arg_parser::Cli;
use romcat::engine::handle_run;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let start_time = Instant::now();
    let cli = Cli::parse();
    if let Err(err) = handle_run(&cli) {
        eprintln!("{} {:#}", "✖".red(), err);
        return ExitCode::from(130);
    }
    log::debug!("Total time: {:?}", start_time.elapsed());
    ExitCode::SUCCESS
}
