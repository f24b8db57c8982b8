//! Album records and the fixed album type vocabulary.

use serde::{Deserialize, Serialize};

use super::compliance::ComplianceResult;

/// Earliest release year accepted anywhere in the catalog.
pub const MIN_YEAR: u16 = 1950;
/// Latest release year accepted anywhere in the catalog.
pub const MAX_YEAR: u16 = 2030;

/// Returns true if `year` falls inside the accepted release window.
pub fn is_valid_year(year: i64) -> bool {
    (i64::from(MIN_YEAR)..=i64::from(MAX_YEAR)).contains(&year)
}

/// The eight release types a band's album can be classified as.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum AlbumType {
    #[default]
    Album,
    Compilation,
    EP,
    Live,
    Single,
    Demo,
    Instrumental,
    Split,
}

impl AlbumType {
    /// Every type, in declaration order.
    pub const ALL: [AlbumType; 8] = [
        AlbumType::Album,
        AlbumType::Compilation,
        AlbumType::EP,
        AlbumType::Live,
        AlbumType::Single,
        AlbumType::Demo,
        AlbumType::Instrumental,
        AlbumType::Split,
    ];

    /// Canonical name, also used as the type folder name in enhanced layouts.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumType::Album => "Album",
            AlbumType::Compilation => "Compilation",
            AlbumType::EP => "EP",
            AlbumType::Live => "Live",
            AlbumType::Single => "Single",
            AlbumType::Demo => "Demo",
            AlbumType::Instrumental => "Instrumental",
            AlbumType::Split => "Split",
        }
    }

    /// Recognize a type folder name such as `Live`, `eps` or `Compilations`.
    pub fn from_folder_name(name: &str) -> Option<AlbumType> {
        let lower = name.trim().to_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        AlbumType::ALL.into_iter().find(|t| {
            let canonical = t.as_str().to_lowercase();
            canonical == lower || canonical == singular
        })
    }
}

impl std::fmt::Display for AlbumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known album type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown album type: {0}")]
pub struct UnknownAlbumType(pub String);

impl std::str::FromStr for AlbumType {
    type Err = UnknownAlbumType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlbumType::from_folder_name(s).ok_or_else(|| UnknownAlbumType(s.to_string()))
    }
}

/// What the type detector proposed for an album, kept for diagnostics even
/// when the proposal was rejected in favor of the configured default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub detected: AlbumType,
    pub confidence: f32,
    pub accepted: bool,
}

/// One physical or known-but-absent release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(rename = "album_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(rename = "type", default)]
    pub album_type: AlbumType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_count: Option<u32>,
    /// Absent for albums known only from metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionRecord>,
}

impl Album {
    /// A bare album with only a name and an optional year.
    pub fn new(name: impl Into<String>, year: Option<u16>) -> Self {
        Self {
            name: name.into(),
            year,
            edition: None,
            album_type: AlbumType::default(),
            track_count: None,
            folder_path: None,
            compliance: None,
            detection: None,
        }
    }

    pub fn with_type(mut self, album_type: AlbumType) -> Self {
        self.album_type = album_type;
        self
    }

    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = Some(edition.into());
        self
    }

    /// Identity used to keep local and missing collections disjoint.
    ///
    /// Names compare case-insensitively with surrounding whitespace ignored.
    pub fn key(&self) -> AlbumKey {
        AlbumKey {
            name: self.name.trim().to_lowercase(),
            year: self.year,
        }
    }
}

/// `(name, year)` identity of an album.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlbumKey {
    pub name: String,
    pub year: Option<u16>,
}
