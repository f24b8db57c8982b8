//! Collection summary, as persisted in `{music_root}/.collection_index.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::album::AlbumType;
use super::band::{Band, StructureType};
use super::compliance::ComplianceLevel;

/// File name of the collection index document.
pub const COLLECTION_INDEX_FILE: &str = ".collection_index.json";

/// Per-band summary line in the collection index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandIndexEntry {
    pub name: String,
    pub albums_count: usize,
    pub local_albums_count: usize,
    pub missing_albums_count: usize,
    pub has_metadata: bool,
    pub has_analysis: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_type: Option<StructureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_score: Option<u8>,
}

impl BandIndexEntry {
    pub fn from_band(band: &Band, has_metadata: bool) -> Self {
        Self {
            name: band.name.clone(),
            albums_count: band.total_albums_count(),
            local_albums_count: band.local_albums_count(),
            missing_albums_count: band.missing_albums_count(),
            has_metadata,
            has_analysis: band.has_analysis(),
            last_updated: Some(band.last_updated),
            structure_type: band.folder_structure.as_ref().map(|s| s.structure_type),
            compliance_score: band.compliance.as_ref().map(|c| c.overall_score),
        }
    }
}

/// Aggregate statistics over every indexed band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionStats {
    pub total_bands: usize,
    pub total_albums: usize,
    pub total_local_albums: usize,
    pub total_missing_albums: usize,
    pub type_distribution: BTreeMap<AlbumType, usize>,
    pub average_compliance_score: f64,
    pub compliance_distribution: BTreeMap<ComplianceLevel, usize>,
    pub bands_needing_attention: Vec<String>,
}

/// Free-form observations written by external collaborators.
///
/// Preserved verbatim across rescans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionInsights {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub top_rated_bands: Vec<String>,
    pub suggested_purchases: Vec<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Summary over all bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionIndex {
    pub bands: Vec<BandIndexEntry>,
    pub stats: CollectionStats,
    pub last_scan: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<CollectionInsights>,
}

impl CollectionIndex {
    pub fn band(&self, name: &str) -> Option<&BandIndexEntry> {
        self.bands.iter().find(|b| b.name == name)
    }
}
