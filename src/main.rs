//! Music Catalog - scans a music library, classifies albums and checks
//! folder names against the naming conventions.

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use music_catalog::{cli, config};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging; `scan`, `storage`, `cache` and `config` are explicit targets
    let level = if args.verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in ["music_catalog", "scan", "storage", "cache", "config"] {
        filter = filter.add_directive(format!("{target}={level}").parse()?);
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load().with_env();

    if !cli::run_command(&args, config)? {
        cli::Cli::command().print_help()?;
    }
    Ok(())
}
