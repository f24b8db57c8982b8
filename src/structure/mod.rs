//! Band-level folder structure analysis.
//!
//! Looks at how every album folder of one band was parsed and decides which
//! organizational pattern the band follows, how consistently, and what could
//! be improved. Purely advisory: nothing here touches the file system.

use crate::model::{Consistency, FolderStructure, PatternCounts, StructureType};
use crate::parser::{NamingPattern, ParseResult};

/// Classifies a band's folder layout from its parsed album names.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandStructureDetector;

impl BandStructureDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, albums: &[ParseResult]) -> FolderStructure {
        let counts = count_patterns(albums);
        let total = counts.total();

        if total == 0 {
            return FolderStructure {
                structure_type: StructureType::Unknown,
                consistency: Consistency::Consistent,
                structure_score: 0,
                pattern_counts: counts,
                recommendations: Vec::new(),
            };
        }

        let structure_type = classify(&counts);
        let dominant = dominant_pattern(&counts);

        let dominant_count = pattern_count(&counts, dominant);
        let canonical_editions = albums.iter().filter(|a| a.edition_is_canonical()).count();
        let agreeing = albums
            .iter()
            .filter(|a| a.pattern == dominant && a.edition_is_canonical())
            .count();

        let dominance_pct = percentage(dominant_count, total);
        let edition_pct = percentage(canonical_editions, total);
        let structure_score = ((dominance_pct + edition_pct) / 2.0).round() as u8;

        FolderStructure {
            structure_type,
            consistency: Consistency::from_percentage(percentage(agreeing, total)),
            structure_score,
            pattern_counts: counts,
            recommendations: recommendations(structure_type, &counts, total - canonical_editions),
        }
    }
}

/// The pattern followed by most albums. Ties favor Enhanced, then Default.
pub fn dominant_pattern(counts: &PatternCounts) -> NamingPattern {
    [
        NamingPattern::Enhanced,
        NamingPattern::Default,
        NamingPattern::Legacy,
    ]
    .into_iter()
    .rev()
    .max_by_key(|p| pattern_count(counts, *p))
    .unwrap_or(NamingPattern::Default)
}

pub fn count_patterns(albums: &[ParseResult]) -> PatternCounts {
    let mut counts = PatternCounts::default();
    for album in albums {
        match album.pattern {
            NamingPattern::Default => counts.default += 1,
            NamingPattern::Enhanced => counts.enhanced += 1,
            NamingPattern::Legacy => counts.legacy += 1,
        }
    }
    counts
}

fn classify(counts: &PatternCounts) -> StructureType {
    let PatternCounts {
        default,
        enhanced,
        legacy,
    } = *counts;

    match (default, enhanced, legacy) {
        (0, 0, 0) => StructureType::Unknown,
        (0, e, 0) if e > 0 => StructureType::Enhanced,
        (d, 0, 0) if d > 0 => StructureType::Default,
        (0, 0, _) => StructureType::Legacy,
        _ => StructureType::Mixed,
    }
}

fn pattern_count(counts: &PatternCounts, pattern: NamingPattern) -> usize {
    match pattern {
        NamingPattern::Default => counts.default,
        NamingPattern::Enhanced => counts.enhanced,
        NamingPattern::Legacy => counts.legacy,
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn albums(n: usize) -> String {
    if n == 1 {
        "1 album".to_string()
    } else {
        format!("{n} albums")
    }
}

fn recommendations(
    structure_type: StructureType,
    counts: &PatternCounts,
    non_canonical_editions: usize,
) -> Vec<String> {
    let mut recs = Vec::new();

    if counts.legacy > 0 {
        recs.push(format!(
            "{} missing year prefix (rename to 'YYYY - Title')",
            albums(counts.legacy)
        ));
    }
    if non_canonical_editions > 0 {
        recs.push(format!(
            "{} with non-standard edition formatting (use '(X Edition)')",
            albums(non_canonical_editions)
        ));
    }
    match structure_type {
        StructureType::Default => {
            recs.push("Consider migrating to enhanced type-based structure".to_string());
        }
        StructureType::Mixed if counts.default > 0 && counts.enhanced > 0 => {
            recs.push(format!(
                "Standardize on one layout: {} in type folders, {} directly under the band",
                albums(counts.enhanced),
                albums(counts.default)
            ));
        }
        _ => {}
    }

    recs
}
