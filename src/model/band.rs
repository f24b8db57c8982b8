//! Band metadata, as persisted in `{band_folder}/.band_metadata.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::album::{Album, AlbumKey, is_valid_year};
use super::compliance::BandComplianceReport;
use crate::error::ValidationError;

/// File name of the per-band metadata document.
pub const BAND_METADATA_FILE: &str = ".band_metadata.json";

/// Version written by this build. Older documents are upgraded on load.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Organizational pattern used by a band's album folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    /// `Band/YYYY - Title (Edition)`
    Default,
    /// `Band/Type/YYYY - Title (Edition)`
    Enhanced,
    Mixed,
    /// Bare titles without year prefix
    Legacy,
    Unknown,
}

impl StructureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureType::Default => "default",
            StructureType::Enhanced => "enhanced",
            StructureType::Mixed => "mixed",
            StructureType::Legacy => "legacy",
            StructureType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StructureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How uniformly a band's albums follow its dominant pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Consistent,
    MostlyConsistent,
    Inconsistent,
}

impl Consistency {
    /// Classify the share (0-100) of albums that agree with the dominant pattern.
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 90.0 {
            Consistency::Consistent
        } else if pct >= 70.0 {
            Consistency::MostlyConsistent
        } else {
            Consistency::Inconsistent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Consistent => "consistent",
            Consistency::MostlyConsistent => "mostly_consistent",
            Consistency::Inconsistent => "inconsistent",
        }
    }
}

/// How many albums were parsed with each naming pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternCounts {
    pub default: usize,
    pub enhanced: usize,
    pub legacy: usize,
}

impl PatternCounts {
    pub fn total(&self) -> usize {
        self.default + self.enhanced + self.legacy
    }
}

/// One band's organizational pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderStructure {
    #[serde(rename = "type")]
    pub structure_type: StructureType,
    pub consistency: Consistency,
    pub structure_score: u8,
    #[serde(default)]
    pub pattern_counts: PatternCounts,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Per-album review inside a band analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumAnalysis {
    pub album_name: String,
    pub review: String,
    pub rate: Option<u8>,
}

/// Editorial analysis attached to a band by external collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandAnalysis {
    pub review: String,
    pub rate: Option<u8>,
    pub albums: Vec<AlbumAnalysis>,
    pub similar_bands: Vec<String>,
    pub similar_bands_missing: Vec<String>,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn current_schema() -> u32 {
    CURRENT_SCHEMA_VERSION
}

/// Aggregate of one artist's albums plus structure analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    #[serde(rename = "band_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formed: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    /// Albums physically present, in folder order.
    #[serde(default)]
    pub albums: Vec<Album>,
    /// Albums known from metadata without a local folder.
    #[serde(default)]
    pub albums_missing: Vec<Album>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_structure: Option<FolderStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<BandComplianceReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze: Option<BandAnalysis>,
    /// Missing timestamps read as the epoch so the entry is always stale.
    #[serde(default = "unix_epoch")]
    pub last_updated: DateTime<Utc>,
    #[serde(default = "current_schema")]
    pub schema_version: u32,
}

impl Band {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formed: None,
            genres: Vec::new(),
            origin: None,
            members: Vec::new(),
            albums: Vec::new(),
            albums_missing: Vec::new(),
            folder_structure: None,
            compliance: None,
            analyze: None,
            last_updated: Utc::now(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn local_albums_count(&self) -> usize {
        self.albums.len()
    }

    pub fn missing_albums_count(&self) -> usize {
        self.albums_missing.len()
    }

    pub fn total_albums_count(&self) -> usize {
        self.local_albums_count() + self.missing_albums_count()
    }

    pub fn has_analysis(&self) -> bool {
        self.analyze
            .as_ref()
            .is_some_and(|a| !a.review.is_empty() || a.rate.is_some() || !a.albums.is_empty())
    }

    /// Check every schema constraint, returning the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "band_name".to_string(),
            });
        }

        for (field, list) in [("albums", &self.albums), ("albums_missing", &self.albums_missing)] {
            for (i, album) in list.iter().enumerate() {
                validate_album(&format!("{field}[{i}]"), album)?;
            }
        }

        let local: HashSet<AlbumKey> = self.albums.iter().map(Album::key).collect();
        if let Some((i, dup)) = self
            .albums_missing
            .iter()
            .enumerate()
            .find(|(_, a)| local.contains(&a.key()))
        {
            return Err(ValidationError::DuplicateAlbum {
                field: format!("albums_missing[{i}]"),
                name: dup.name.clone(),
                year: dup.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
            });
        }

        if let Some(analysis) = &self.analyze {
            validate_rating("analyze.rate", analysis.rate)?;
            for (i, album) in analysis.albums.iter().enumerate() {
                validate_rating(&format!("analyze.albums[{i}].rate"), album.rate)?;
            }
        }

        Ok(())
    }

    /// Replace the local album list with freshly scanned albums.
    ///
    /// Missing entries that now exist locally are dropped, and previously
    /// local albums without a folder move to `albums_missing`, so no album is
    /// lost and the two collections stay disjoint.
    pub fn replace_local_albums(&mut self, scanned: Vec<Album>) {
        let local: HashSet<AlbumKey> = scanned.iter().map(Album::key).collect();
        self.albums_missing.retain(|a| !local.contains(&a.key()));

        let mut known: HashSet<AlbumKey> = self.albums_missing.iter().map(Album::key).collect();
        let previous = std::mem::replace(&mut self.albums, scanned);
        for album in previous {
            let key = album.key();
            // A year-less record is the same album once its folder gains a year
            let renamed = key.year.is_none() && local.iter().any(|k| k.name == key.name);
            if local.contains(&key) || renamed || !known.insert(key) {
                continue;
            }
            self.albums_missing.push(Album {
                track_count: None,
                folder_path: None,
                compliance: None,
                detection: None,
                ..album
            });
        }
    }
}

fn validate_album(field: &str, album: &Album) -> Result<(), ValidationError> {
    if album.name.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: format!("{field}.album_name"),
        });
    }
    if let Some(year) = album.year
        && !is_valid_year(i64::from(year))
    {
        return Err(ValidationError::YearOutOfRange {
            field: format!("{field}.year"),
            value: i64::from(year),
        });
    }
    Ok(())
}

fn validate_rating(field: &str, rate: Option<u8>) -> Result<(), ValidationError> {
    match rate {
        Some(r) if !(1..=10).contains(&r) => Err(ValidationError::RatingOutOfRange {
            field: field.to_string(),
            value: i64::from(r),
        }),
        _ => Ok(()),
    }
}

/// Partial metadata supplied by an explicit save.
///
/// Only fields that are `Some` are applied. Local albums are merged by
/// `(name, year)`; the other lists are replaced wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BandMetadataUpdate {
    pub formed: Option<String>,
    pub genres: Option<Vec<String>>,
    pub origin: Option<String>,
    pub members: Option<Vec<String>>,
    pub albums: Option<Vec<Album>>,
    pub albums_missing: Option<Vec<Album>>,
    pub analyze: Option<BandAnalysis>,
}

impl BandMetadataUpdate {
    /// Apply this update on top of `band`. Validation is the caller's job.
    pub fn apply_to(self, band: &mut Band) {
        if let Some(formed) = self.formed {
            band.formed = Some(formed);
        }
        if let Some(genres) = self.genres {
            band.genres = genres;
        }
        if let Some(origin) = self.origin {
            band.origin = Some(origin);
        }
        if let Some(members) = self.members {
            band.members = members;
        }
        if let Some(albums) = self.albums {
            for incoming in albums {
                match band.albums.iter_mut().find(|a| a.key() == incoming.key()) {
                    Some(existing) => merge_album(existing, incoming),
                    None => band.albums.push(incoming),
                }
            }
        }
        if let Some(missing) = self.albums_missing {
            band.albums_missing = missing;
        }
        if let Some(analyze) = self.analyze {
            band.analyze = Some(analyze);
        }
        band.last_updated = Utc::now();
    }
}

/// Scan-derived fields (path, track count, compliance) survive a metadata merge.
fn merge_album(existing: &mut Album, incoming: Album) {
    existing.name = incoming.name;
    existing.album_type = incoming.album_type;
    if incoming.edition.is_some() {
        existing.edition = incoming.edition;
    }
    if incoming.track_count.is_some() {
        existing.track_count = incoming.track_count;
    }
    if incoming.folder_path.is_some() {
        existing.folder_path = incoming.folder_path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlbumType;

    fn band_with(albums: Vec<Album>, missing: Vec<Album>) -> Band {
        let mut band = Band::new("Pink Floyd");
        band.albums = albums;
        band.albums_missing = missing;
        band
    }

    #[test]
    fn test_counts() {
        let band = band_with(
            vec![Album::new("Meddle", Some(1971)), Album::new("Animals", Some(1977))],
            vec![Album::new("The Wall", Some(1979))],
        );
        assert_eq!(band.local_albums_count(), 2);
        assert_eq!(band.missing_albums_count(), 1);
        assert_eq!(band.total_albums_count(), 3);
    }

    #[test]
    fn test_duplicate_across_collections_rejected() {
        let band = band_with(
            vec![Album::new("Meddle", Some(1971))],
            vec![Album::new("meddle", Some(1971))],
        );
        let err = band.validate().unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateAlbum { .. }));
        assert_eq!(err.field(), "albums_missing[0]");
    }

    #[test]
    fn test_same_name_different_year_allowed() {
        let band = band_with(
            vec![Album::new("Live", Some(1980))],
            vec![Album::new("Live", Some(1990))],
        );
        assert!(band.validate().is_ok());
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        let mut band = Band::new("X");
        band.analyze = Some(BandAnalysis {
            rate: Some(11),
            ..Default::default()
        });
        let err = band.validate().unwrap_err();
        assert_eq!(err.field(), "analyze.rate");

        band.analyze = Some(BandAnalysis {
            albums: vec![AlbumAnalysis {
                album_name: "A".into(),
                review: String::new(),
                rate: Some(0),
            }],
            ..Default::default()
        });
        let err = band.validate().unwrap_err();
        assert_eq!(err.field(), "analyze.albums[0].rate");
    }

    #[test]
    fn test_year_out_of_range_rejected() {
        let band = band_with(vec![Album::new("Early", Some(1931))], vec![]);
        let err = band.validate().unwrap_err();
        assert_eq!(err.field(), "albums[0].year");
    }

    #[test]
    fn test_empty_name_rejected() {
        let band = Band::new("  ");
        assert!(matches!(
            band.validate(),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn test_replace_local_albums_drops_found_missing() {
        let mut band = band_with(
            vec![],
            vec![Album::new("Animals", Some(1977)), Album::new("The Wall", Some(1979))],
        );
        band.replace_local_albums(vec![Album::new("Animals", Some(1977))]);
        assert_eq!(band.albums.len(), 1);
        assert_eq!(band.albums_missing.len(), 1);
        assert_eq!(band.albums_missing[0].name, "The Wall");
        assert!(band.validate().is_ok());
    }

    #[test]
    fn test_replace_local_albums_keeps_vanished_as_missing() {
        let mut meddle = Album::new("Meddle", Some(1971));
        meddle.folder_path = Some("1971 - Meddle".into());
        let mut band = band_with(
            vec![
                meddle.clone(),
                Album::new("Animals", Some(1977)).with_edition("Deluxe Edition"),
            ],
            vec![Album::new("The Wall", Some(1979))],
        );

        band.replace_local_albums(vec![meddle]);

        assert_eq!(band.albums.len(), 1);
        let names: Vec<_> = band.albums_missing.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["The Wall", "Animals"]);
        let animals = &band.albums_missing[1];
        assert_eq!(animals.edition.as_deref(), Some("Deluxe Edition"));
        assert!(animals.folder_path.is_none());
        assert!(band.validate().is_ok());
    }

    #[test]
    fn test_replace_local_albums_no_duplicate_missing() {
        let mut band = band_with(
            vec![Album::new("Animals", Some(1977))],
            vec![Album::new("animals", Some(1977))],
        );
        band.replace_local_albums(vec![]);
        assert!(band.albums.is_empty());
        assert_eq!(band.albums_missing.len(), 1);
    }

    #[test]
    fn test_replace_local_albums_year_added_to_folder() {
        let mut band = band_with(vec![Album::new("Apocalyptic Love", None)], vec![]);
        band.replace_local_albums(vec![Album::new("Apocalyptic Love", Some(2012))]);
        assert_eq!(band.albums[0].year, Some(2012));
        assert!(band.albums_missing.is_empty());
    }

    #[test]
    fn test_update_merges_albums_and_keeps_scan_fields() {
        let mut scanned = Album::new("Meddle", Some(1971));
        scanned.folder_path = Some("/music/Pink Floyd/1971 - Meddle".into());
        scanned.track_count = Some(6);
        let mut band = band_with(vec![scanned], vec![]);

        let update = BandMetadataUpdate {
            genres: Some(vec!["Progressive Rock".into()]),
            albums: Some(vec![
                Album::new("Meddle", Some(1971)).with_type(AlbumType::Album),
                Album::new("Relics", Some(1971)).with_type(AlbumType::Compilation),
            ]),
            ..Default::default()
        };
        update.apply_to(&mut band);

        assert_eq!(band.genres, vec!["Progressive Rock".to_string()]);
        assert_eq!(band.albums.len(), 2);
        assert_eq!(band.albums[0].track_count, Some(6));
        assert!(band.albums[0].folder_path.is_some());
        assert_eq!(band.albums[1].album_type, AlbumType::Compilation);
    }

    #[test]
    fn test_missing_last_updated_reads_as_epoch() {
        let band: Band = serde_json::from_str(r#"{"band_name": "X"}"#).unwrap();
        assert_eq!(band.last_updated, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(band.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_unicode_names_roundtrip() {
        let mut band = Band::new("Sigur Rós");
        band.albums.push(Album::new("Ágætis byrjun", Some(1999)));
        let json = serde_json::to_string(&band).unwrap();
        let back: Band = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "Sigur Rós");
        assert_eq!(back.albums[0].name, "Ágætis byrjun");
    }
}
