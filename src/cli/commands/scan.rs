//! Scanning and band metadata commands.

use anyhow::Context;
use std::path::Path;

use crate::library::{Catalog, ScanOptions};
use crate::model::{Band, BandMetadataUpdate};

/// Scan the music root and print a summary
pub fn cmd_scan(catalog: &Catalog, force: bool) -> anyhow::Result<()> {
    println!("Scanning music root: {}", catalog.root().display());
    let report = catalog.scan(ScanOptions { force })?;

    for warning in &report.warnings {
        println!("  ? {}", warning);
    }
    for issue in &report.issues {
        eprintln!("  ✗ {}: {}", issue.band, issue.message);
    }

    let stats = &report.index.stats;
    println!();
    println!("Scan complete");
    println!("=============");
    println!("Bands:          {}", stats.total_bands);
    println!("  analyzed:     {}", report.processed.len());
    println!("  fresh:        {}", report.skipped_fresh.len());
    println!("  failed:       {}", report.issues.len());
    println!("Local albums:   {}", stats.total_local_albums);
    println!("Missing albums: {}", stats.total_missing_albums);

    if !stats.type_distribution.is_empty() {
        println!();
        println!("Album types:");
        for (album_type, count) in &stats.type_distribution {
            println!("  {:<12} {}", album_type.as_str(), count);
        }
    }

    if !stats.compliance_distribution.is_empty() {
        println!();
        println!("Compliance (average {:.1}):", stats.average_compliance_score);
        for (level, count) in &stats.compliance_distribution {
            println!("  {} {:<10} {}", level.symbol(), level.as_str(), count);
        }
    }

    if !stats.bands_needing_attention.is_empty() {
        println!();
        println!("Bands needing attention:");
        for band in &stats.bands_needing_attention {
            println!("  - {}", band);
        }
    }
    Ok(())
}

/// Show one band
pub fn cmd_show(catalog: &Catalog, band: &str, json: bool) -> anyhow::Result<()> {
    let band = catalog.get_band(band)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&band)?);
    } else {
        print_band(&band);
    }
    Ok(())
}

/// Merge a JSON update file into a band's metadata
pub fn cmd_save(catalog: &Catalog, band: &str, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let update: BandMetadataUpdate = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid metadata update", file.display()))?;

    let saved = catalog.save_band_metadata(band, update)?;
    println!("Saved {}", saved.outcome.path.display());
    if let Some(backup) = &saved.outcome.backup {
        println!("Backup: {}", backup.display());
    } else if saved.outcome.backup_skipped {
        eprintln!("Warning: a backup for this second already existed; previous content not backed up");
    }
    Ok(())
}

fn print_band(band: &Band) {
    println!("{}", band.name);
    println!("{}", "=".repeat(band.name.chars().count()));
    if let Some(formed) = &band.formed {
        println!("Formed:  {}", formed);
    }
    if let Some(origin) = &band.origin {
        println!("Origin:  {}", origin);
    }
    if !band.genres.is_empty() {
        println!("Genres:  {}", band.genres.join(", "));
    }
    if let Some(structure) = &band.folder_structure {
        println!(
            "Layout:  {} ({}, score {})",
            structure.structure_type.as_str(),
            structure.consistency.as_str(),
            structure.structure_score
        );
    }
    if let Some(report) = &band.compliance {
        println!(
            "Compliance: {} {} ({})",
            report.compliance_level.symbol(),
            report.overall_score,
            report.compliance_level.as_str()
        );
    }
    if let Some(rate) = band.analyze.as_ref().and_then(|a| a.rate) {
        println!("Rating:  {}/10", rate);
    }

    println!();
    println!("Albums ({}):", band.local_albums_count());
    for album in &band.albums {
        let year = album.year.map(|y| y.to_string()).unwrap_or_else(|| "----".into());
        let edition = album
            .edition
            .as_deref()
            .map(|e| format!(" ({})", e))
            .unwrap_or_default();
        println!(
            "  {} - {}{} [{}]",
            year,
            album.name,
            edition,
            album.album_type.as_str()
        );
    }

    if !band.albums_missing.is_empty() {
        println!();
        println!("Missing ({}):", band.missing_albums_count());
        for album in &band.albums_missing {
            match album.year {
                Some(year) => println!("  {} - {}", year, album.name),
                None => println!("  {}", album.name),
            }
        }
    }
}
