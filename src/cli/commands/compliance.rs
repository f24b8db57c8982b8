//! Folder-name compliance command.

use crate::library::Catalog;

/// Print a band's compliance report
pub fn cmd_validate(catalog: &Catalog, band_name: &str, all: bool) -> anyhow::Result<()> {
    let Some(report) = catalog.validate_compliance(band_name)? else {
        println!("Nothing to validate for {} (no albums, or structure analysis disabled)", band_name);
        return Ok(());
    };

    println!(
        "{}: {} {} ({})",
        band_name,
        report.compliance_level.symbol(),
        report.overall_score,
        report.compliance_level.as_str()
    );
    println!(
        "{} of {} albums need fixes",
        report.albums_needing_fixes, report.albums_evaluated
    );
    if report.needs_attention {
        println!("Below the compliance threshold");
    }

    let band = catalog.analyze_band(band_name)?;
    println!();
    for album in &band.albums {
        let Some(result) = &album.compliance else {
            continue;
        };
        if result.is_compliant() && !all {
            continue;
        }
        let current = album.folder_path.as_deref().unwrap_or(&album.name);
        println!("  {} {:>3}  {}", result.level.symbol(), result.score, current);
        for description in result.issues.descriptions() {
            println!("         - {}", description);
        }
        if let Some(path) = &result.recommended_path
            && path != current
        {
            println!("         -> {}", path);
        }
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for recommendation in &report.recommendations {
            println!("  - {}", recommendation);
        }
    }
    Ok(())
}
