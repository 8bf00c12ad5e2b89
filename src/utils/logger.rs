//! Console logging for the CLI: `env_logger` with colored level tags.

use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Module path without the crate prefix (`romcat::pipeline::prune` -> `pipeline::prune`).
fn short_target(target: &str) -> &str {
    target
        .strip_prefix(env!("CARGO_PKG_NAME"))
        .map(|rest| rest.trim_start_matches("::"))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(target)
}

/// Dependencies log at `warn`; romcat at `info`, or `debug` when `verbose`. `RUST_LOG` still
/// applies on top.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // A second call in the same process (tests, cleandb after index) keeps the first logger.
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let tag = env!("CARGO_PKG_NAME").cyan();
            let line = match record.level() {
                Level::Error => format!(
                    "[{tag} {} {}] {}",
                    "ERROR".red(),
                    short_target(record.target()).white(),
                    record.args()
                ),
                Level::Warn => format!(
                    "[{tag} {} {}] {}",
                    "WARN".yellow(),
                    short_target(record.target()).white(),
                    record.args()
                ),
                Level::Info => format!("[{tag}] {}", record.args()),
                Level::Debug | Level::Trace => {
                    format!("[{tag}] {}", record.args().to_string().dimmed())
                }
            };
            writeln!(buf, "{line}")
        })
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_loses_crate_prefix() {
        assert_eq!(short_target("romcat::pipeline::prune"), "pipeline::prune");
        assert_eq!(short_target("romcat"), "romcat");
        assert_eq!(short_target("rusqlite::cache"), "rusqlite::cache");
    }
}
