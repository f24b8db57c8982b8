//! Edition suffix normalization.
//!
//! `(deluxe)`, `(Deluxe Edition)` and `(DELUXE version)` all normalize to
//! `Deluxe Edition`. Anniversary editions keep their ordinal
//! (`25th Anniversary Edition`). Anything outside the vocabulary is kept
//! verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

static EDITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?P<ordinal>\d+(?:st|nd|rd|th))\s+)?(?P<word>.+?)(?:\s+(?:edition|version))?$")
        .unwrap()
});

/// Lowercase keyword to canonical spelling.
const VOCABULARY: &[(&str, &str)] = &[
    ("deluxe", "Deluxe"),
    ("limited", "Limited"),
    ("anniversary", "Anniversary"),
    ("remastered", "Remastered"),
    ("remaster", "Remastered"),
    ("expanded", "Expanded"),
    ("special", "Special"),
    ("collector's", "Collector's"),
    ("collectors", "Collector's"),
    ("bonus", "Bonus"),
    ("demo", "Demo"),
    ("live", "Live"),
    ("instrumental", "Instrumental"),
    ("split", "Split"),
];

/// Outcome of normalizing a raw edition suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    /// Canonical `"X Edition"` form, or the trimmed raw text if unrecognized.
    pub normalized: String,
    pub recognized: bool,
}

/// Normalize the text found between the trailing parentheses of a folder name.
pub fn normalize_edition(raw: &str) -> Edition {
    let trimmed = raw.trim();
    let verbatim = Edition {
        normalized: trimmed.to_string(),
        recognized: false,
    };

    let Some(caps) = EDITION_RE.captures(trimmed) else {
        return verbatim;
    };
    let word = caps["word"].trim().to_lowercase();
    let Some((keyword, canonical)) = VOCABULARY.iter().find(|(k, _)| *k == word) else {
        return verbatim;
    };

    let normalized = match caps.name("ordinal") {
        Some(ordinal) if *keyword == "anniversary" => {
            format!("{} {} Edition", ordinal.as_str().to_lowercase(), canonical)
        }
        Some(_) => return verbatim,
        None => format!("{canonical} Edition"),
    };

    Edition {
        normalized,
        recognized: true,
    }
}

/// True if `raw` is recognized and already spelled canonically.
pub fn is_canonical(raw: &str) -> bool {
    let edition = normalize_edition(raw);
    edition.recognized && edition.normalized == raw.trim()
}
