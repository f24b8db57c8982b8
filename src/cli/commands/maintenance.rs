//! Cache, backup and configuration housekeeping.

use crate::cache::CacheStatus;
use crate::config::{self, Config};
use crate::library::Catalog;

/// List every metadata file with its cache status
pub fn cmd_cache_status(catalog: &Catalog) -> anyhow::Result<()> {
    let statuses = catalog.cache_status();
    if statuses.is_empty() {
        println!("No metadata files under {}", catalog.root().display());
        return Ok(());
    }

    let mut stale = 0;
    for (path, status) in &statuses {
        let shown = path.strip_prefix(catalog.root()).unwrap_or(path);
        println!("  {:<10} {}", status.as_str(), shown.display());
        if status.needs_refresh() {
            stale += 1;
        }
    }
    println!();
    println!("{} files, {} need refresh", statuses.len(), stale);
    if statuses.iter().any(|(_, s)| *s == CacheStatus::Corrupted) {
        println!("Run `cleanup` to delete corrupted files.");
    }
    Ok(())
}

/// Delete expired and corrupted metadata files
pub fn cmd_cleanup(catalog: &Catalog) -> anyhow::Result<()> {
    let report = catalog.cleanup_cache();
    for path in &report.removed {
        println!("  removed {}", path.display());
    }
    for (path, error) in &report.errors {
        eprintln!("  ✗ {}: {}", path.display(), error);
    }
    println!(
        "Checked {} files, removed {}",
        report.scanned,
        report.removed.len()
    );
    Ok(())
}

/// Prune old backups
pub fn cmd_prune_backups(catalog: &Catalog) -> anyhow::Result<()> {
    let report = catalog.prune_backups();
    for (path, error) in &report.errors {
        eprintln!("  ✗ {}: {}", path.display(), error);
    }
    println!(
        "Removed {} backups, kept {}",
        report.removed.len(),
        report.kept
    );
    Ok(())
}

/// Print the effective configuration, optionally saving it
pub fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    match config::config_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory on this platform"),
    }
    println!("{}", toml::to_string_pretty(config)?);

    if save {
        config::save(config)?;
        println!("Configuration saved.");
    }
    Ok(())
}
