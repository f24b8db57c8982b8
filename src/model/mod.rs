//! Core data models for the music catalog.
//!
//! Defines the primary entities: [`Album`], [`Band`], [`ComplianceResult`]
//! and [`CollectionIndex`]. All of them serialize to the on-disk JSON
//! documents:
//!
//! - `{band_folder}/.band_metadata.json` - one [`Band`]
//! - `{music_root}/.collection_index.json` - one [`CollectionIndex`]
//!
//! Documents written by older versions are upgraded by [`migration`].

mod album;
mod band;
mod collection;
mod compliance;
pub mod migration;

pub use album::{
    Album, AlbumKey, AlbumType, DetectionRecord, MAX_YEAR, MIN_YEAR, UnknownAlbumType,
    is_valid_year,
};
pub use band::{
    AlbumAnalysis, BAND_METADATA_FILE, Band, BandAnalysis, BandMetadataUpdate,
    CURRENT_SCHEMA_VERSION, Consistency, FolderStructure, PatternCounts, StructureType,
};
pub use collection::{
    BandIndexEntry, COLLECTION_INDEX_FILE, CollectionIndex, CollectionInsights, CollectionStats,
};
pub use compliance::{BandComplianceReport, ComplianceIssues, ComplianceLevel, ComplianceResult};
