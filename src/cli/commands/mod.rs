//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `scan`: scanning, showing and editing band metadata
//! - `compliance`: folder-name compliance reports
//! - `maintenance`: cache, backup and configuration housekeeping

mod compliance;
mod maintenance;
mod scan;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::library::Catalog;

pub use compliance::cmd_validate;
pub use maintenance::{cmd_cache_status, cmd_cleanup, cmd_config, cmd_prune_backups};
pub use scan::{cmd_save, cmd_scan, cmd_show};

/// Music Catalog CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Music root directory (overrides the config file)
    #[arg(short, long, global = true, env = "MUSIC_ROOT_PATH")]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan every band and rebuild the collection index
    Scan {
        /// Re-analyze bands whose metadata is still fresh
        #[arg(short, long)]
        force: bool,
    },
    /// Show one band's metadata
    Show {
        /// Band folder name
        band: String,
        /// Print the raw JSON document
        #[arg(long)]
        json: bool,
    },
    /// Merge a partial metadata update into a band
    Save {
        /// Band folder name
        band: String,
        /// JSON file holding the update (formed, genres, albums_missing, analyze, ...)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Score a band's folder names against the naming conventions
    Validate {
        /// Band folder name
        band: String,
        /// Also list every album, not only those needing fixes
        #[arg(short, long)]
        all: bool,
    },
    /// Show the freshness of every metadata file
    CacheStatus,
    /// Delete expired and corrupted metadata files
    Cleanup,
    /// Apply the backup retention policy
    PruneBackups,
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

/// Run a CLI command if one was specified.
/// Returns `Ok(true)` if a command was run, `Ok(false)` if none was given.
pub fn run_command(cli: &Cli, mut config: Config) -> anyhow::Result<bool> {
    if let Some(root) = &cli.root {
        config.library.music_root = Some(root.clone());
    }

    let Some(command) = &cli.command else {
        return Ok(false);
    };

    // Only `config` works without a music root
    let catalog = || Catalog::from_config(&config);
    match command {
        Commands::Scan { force } => cmd_scan(&catalog()?, *force)?,
        Commands::Show { band, json } => cmd_show(&catalog()?, band, *json)?,
        Commands::Save { band, file } => cmd_save(&catalog()?, band, file)?,
        Commands::Validate { band, all } => cmd_validate(&catalog()?, band, *all)?,
        Commands::CacheStatus => cmd_cache_status(&catalog()?)?,
        Commands::Cleanup => cmd_cleanup(&catalog()?)?,
        Commands::PruneBackups => cmd_prune_backups(&catalog()?)?,
        Commands::Config { save } => cmd_config(&config, *save)?,
    }
    Ok(true)
}
