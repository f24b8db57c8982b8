//! Album folder name parsing.
//!
//! Three naming patterns are tried in priority order:
//!
//! 1. **Default** - `YYYY - Title (Edition)`, year within 1950-2030
//! 2. **Enhanced** - the Default shape nested under a type folder
//!    (`Live/1985 - Title`)
//! 3. **Legacy** - a bare `Title` without year; always matches
//!
//! Parsing never fails. Names that match no structural pattern come back as
//! Legacy results carrying a [`ParseError`] warning.

mod edition;

pub use edition::{Edition, is_canonical, normalize_edition};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{AlbumType, is_valid_year};

static YEAR_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<year>\d{4})\s*-\s*(?P<rest>.+)$").unwrap());

static EDITION_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<title>.*?)\s*\((?P<edition>[^()]+)\)\s*$").unwrap());

/// Characters that are preserved in titles but unsafe in paths.
pub const SPECIAL_CHARACTERS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Which naming pattern a folder name matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPattern {
    Default,
    Enhanced,
    Legacy,
}

/// A folder name that could not be interpreted by the structured patterns.
///
/// Never returned as an `Err`; attached to [`ParseResult::warnings`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("'{folder}' has no year prefix")]
    MissingYear { folder: String },

    #[error("'{folder}' has year {year}, outside 1950-2030")]
    YearOutOfRange { folder: String, year: u32 },

    #[error("'{name}' is not a recognized type folder")]
    UnrecognizedTypeFolder { name: String },
}

/// Where the folder sits relative to its band directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseContext<'a> {
    pub is_in_type_folder: bool,
    pub type_folder_name: Option<&'a str>,
}

impl<'a> ParseContext<'a> {
    /// Album directly under the band folder.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Album nested one level under a type folder.
    pub fn in_type_folder(name: &'a str) -> Self {
        Self {
            is_in_type_folder: true,
            type_folder_name: Some(name),
        }
    }
}

/// Candidate fields extracted from one folder name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub folder_name: String,
    pub year: Option<u16>,
    pub title: String,
    /// Normalized edition.
    pub edition: Option<String>,
    /// Edition text as written in the folder name.
    pub raw_edition: Option<String>,
    pub pattern: NamingPattern,
    /// Recognized type folder the album is nested under, if any.
    pub type_folder: Option<AlbumType>,
    pub warnings: Vec<ParseError>,
}

impl ParseResult {
    /// True if the edition (if any) is already written in canonical form.
    pub fn edition_is_canonical(&self) -> bool {
        self.raw_edition.as_deref().is_none_or(is_canonical)
    }

    pub fn has_special_characters(&self) -> bool {
        self.title.contains(SPECIAL_CHARACTERS)
    }

    pub fn is_legacy(&self) -> bool {
        self.pattern == NamingPattern::Legacy
    }
}

/// Parses album folder names into year, title and edition.
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderNameParser;

impl FolderNameParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, folder_name: &str, context: ParseContext<'_>) -> ParseResult {
        let name = folder_name.trim();
        let mut warnings = Vec::new();

        let type_folder = match (context.is_in_type_folder, context.type_folder_name) {
            (true, Some(tf)) => {
                let recognized = AlbumType::from_folder_name(tf);
                if recognized.is_none() {
                    warnings.push(ParseError::UnrecognizedTypeFolder {
                        name: tf.to_string(),
                    });
                }
                recognized
            }
            _ => None,
        };

        if let Some(caps) = YEAR_PREFIX_RE.captures(name) {
            let digits: u32 = caps["year"].parse().unwrap_or(0);
            if is_valid_year(i64::from(digits)) {
                let (title, raw_edition) = split_edition(caps["rest"].trim(), false);
                let pattern = if type_folder.is_some() {
                    NamingPattern::Enhanced
                } else {
                    NamingPattern::Default
                };
                return ParseResult {
                    folder_name: folder_name.to_string(),
                    year: Some(digits as u16),
                    title,
                    edition: raw_edition.as_deref().map(|e| normalize_edition(e).normalized),
                    raw_edition,
                    pattern,
                    type_folder,
                    warnings,
                };
            }
            warnings.push(ParseError::YearOutOfRange {
                folder: folder_name.to_string(),
                year: digits,
            });
            return legacy(folder_name, name.to_string(), None, type_folder, warnings);
        }

        warnings.push(ParseError::MissingYear {
            folder: folder_name.to_string(),
        });
        let (title, raw_edition) = split_edition(name, true);
        legacy(folder_name, title, raw_edition, type_folder, warnings)
    }
}

fn legacy(
    folder_name: &str,
    title: String,
    raw_edition: Option<String>,
    type_folder: Option<AlbumType>,
    warnings: Vec<ParseError>,
) -> ParseResult {
    ParseResult {
        folder_name: folder_name.to_string(),
        year: None,
        title,
        edition: raw_edition.as_deref().map(|e| normalize_edition(e).normalized),
        raw_edition,
        pattern: NamingPattern::Legacy,
        type_folder,
        warnings,
    }
}

/// Split a trailing `(Edition)` off `text`.
///
/// With `vocabulary_only`, only suffixes from the edition vocabulary are
/// split; used for legacy names where parentheses are often part of the title.
fn split_edition(text: &str, vocabulary_only: bool) -> (String, Option<String>) {
    if let Some(caps) = EDITION_SUFFIX_RE.captures(text) {
        let title = caps["title"].trim();
        let raw = caps["edition"].trim();
        let accept = !title.is_empty() && (!vocabulary_only || normalize_edition(raw).recognized);
        if accept {
            return (title.to_string(), Some(raw.to_string()));
        }
    }
    (text.to_string(), None)
}
