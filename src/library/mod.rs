//! The catalog: the entry points the CLI (or any other front end) calls.
//!
//! - [`Catalog::scan`] walks the music root and refreshes stale band metadata
//! - [`Catalog::get_band`] returns one band's metadata
//! - [`Catalog::save_band_metadata`] merges a partial update under the file lock
//! - [`Catalog::validate_compliance`] re-scores one band without writing

mod analysis;

pub use analysis::{AnalyzedBand, BandAnalyzer};

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cache::{CacheManager, CacheStatus, CleanupReport, tracked_files};
use crate::config::Config;
use crate::error::{Error, Result, ResultExt, StorageError};
use crate::model::migration::{band_from_value, needs_upgrade};
use crate::model::{
    BAND_METADATA_FILE, Band, BandComplianceReport, BandIndexEntry, BandMetadataUpdate,
    COLLECTION_INDEX_FILE, CollectionIndex, CollectionInsights, CollectionStats,
};
use crate::scanner::{self, BandFolder};
use crate::storage::{JsonStorage, PruneReport, RetentionPolicy, SaveOutcome, prune_backups_under};

/// Options for [`Catalog::scan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Re-analyze bands even if their metadata is still fresh.
    pub force: bool,
}

/// A band that could not be processed during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIssue {
    pub band: String,
    pub message: String,
}

/// Outcome of a scan. Per-band failures do not abort the scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub index: CollectionIndex,
    /// Bands analyzed and written.
    pub processed: Vec<String>,
    /// Bands whose metadata was still fresh.
    pub skipped_fresh: Vec<String>,
    pub issues: Vec<ScanIssue>,
    /// Parse warnings for folder names that need attention.
    pub warnings: Vec<String>,
}

/// Result of an explicit metadata save.
#[derive(Debug, Clone)]
pub struct SaveResult {
    pub band: Band,
    pub outcome: SaveOutcome,
}

/// Music catalog rooted at one directory.
pub struct Catalog {
    root: PathBuf,
    analyzer: BandAnalyzer,
    storage: JsonStorage,
    cache: CacheManager,
    retention: RetentionPolicy,
}

impl Catalog {
    pub fn new(config: &Config, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            analyzer: BandAnalyzer::new(config),
            storage: JsonStorage::from_config(&config.storage),
            cache: CacheManager::from_config(&config.cache),
            retention: RetentionPolicy::from_config(&config.storage),
        }
    }

    /// Build a catalog for the configured music root.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = config
            .library
            .music_root
            .clone()
            .ok_or_else(|| Error::config("no music root configured (set MUSIC_ROOT_PATH)"))?;
        if !root.is_dir() {
            return Err(Error::not_found(root));
        }
        Ok(Self::new(config, root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_path(&self, band: &str) -> PathBuf {
        self.root.join(band).join(BAND_METADATA_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(COLLECTION_INDEX_FILE)
    }

    /// Directory of `band`; the name must be a single visible path component.
    fn band_dir(&self, band: &str) -> Result<PathBuf> {
        let plain = !band.is_empty()
            && !band.starts_with('.')
            && !band.contains(['/', '\\']);
        let dir = self.root.join(band);
        if plain && dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::band_not_found(band))
        }
    }

    fn scan_band_folder(&self, band: &str) -> Result<BandFolder> {
        let dir = self.band_dir(band)?;
        scanner::scan_band(band, &dir).with_context(format!("scanning {}", dir.display()))
    }

    /// Stored metadata for `band`, upgraded to the current schema.
    fn load_band(&self, band: &str) -> Result<Option<Band>> {
        match self.storage.load_value(&self.metadata_path(band)) {
            Ok(value) => Ok(Some(band_from_value(value)?)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored metadata already in the current schema; `None` if absent or old.
    fn load_current_band(&self, band: &str) -> Result<Option<Band>> {
        let value = match self.storage.load_value(&self.metadata_path(band)) {
            Ok(value) => value,
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if needs_upgrade(&value) {
            tracing::debug!(target: "scan", "{}: stored metadata needs a schema upgrade", band);
            return Ok(None);
        }
        Ok(Some(band_from_value(value)?))
    }

    /// Analyze `folder` and write the result, merged with whatever is on disk.
    fn refresh_band(&self, folder: &BandFolder) -> Result<(Band, Vec<String>)> {
        let path = self.metadata_path(&folder.name);
        let mut warnings = Vec::new();
        let (band, _) = self
            .storage
            .update(&path, |current| {
                let existing = current.map(band_from_value).transpose()?;
                let analyzed = self.analyzer.analyze(folder, existing.as_ref());
                analyzed.band.validate()?;
                warnings = analyzed.warnings;
                Ok(analyzed.band)
            })
            .map_err(rejection_to_validation)?;
        Ok((band, warnings))
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Scan every band under the root and write the collection index.
    pub fn scan(&self, options: ScanOptions) -> Result<ScanReport> {
        let bands = scanner::list_bands(&self.root)
            .with_context(format!("listing bands in {}", self.root.display()))?;
        tracing::info!(target: "scan", "Scanning {} bands in {}", bands.len(), self.root.display());

        let mut processed = Vec::new();
        let mut skipped_fresh = Vec::new();
        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let mut indexed: Vec<(Band, bool)> = Vec::with_capacity(bands.len());

        for (name, _) in bands {
            let metadata_path = self.metadata_path(&name);

            if !options.force && self.cache.status(&metadata_path) == CacheStatus::Valid {
                match self.load_current_band(&name) {
                    Ok(Some(band)) => {
                        tracing::debug!(target: "scan", "{}: metadata is fresh", name);
                        skipped_fresh.push(name);
                        indexed.push((band, true));
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(target: "scan", "{}: stored metadata unusable: {}", name, e);
                    }
                }
            }

            let folder = match self.scan_band_folder(&name) {
                Ok(folder) => folder,
                Err(e) => {
                    tracing::warn!(target: "scan", "{}: {}", name, e);
                    issues.push(ScanIssue {
                        band: name,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match self.refresh_band(&folder) {
                Ok((band, band_warnings)) => {
                    warnings.extend(band_warnings);
                    processed.push(name);
                    indexed.push((band, true));
                }
                Err(e) => {
                    tracing::warn!(target: "scan", "{}: {}", name, e);
                    issues.push(ScanIssue {
                        band: name,
                        message: e.to_string(),
                    });
                    // Still list the band, from what is on disk
                    let analyzed = self.analyzer.analyze(&folder, None);
                    indexed.push((analyzed.band, metadata_path.exists()));
                }
            }
        }

        let fresh = CollectionIndex {
            bands: indexed
                .iter()
                .map(|(band, has_metadata)| BandIndexEntry::from_band(band, *has_metadata))
                .collect(),
            stats: self.collection_stats(indexed.iter().map(|(band, _)| band)),
            last_scan: Utc::now(),
            insights: None,
        };

        // Insights come from the document read under the index lock
        let written = self.storage.update(&self.index_path(), |current| {
            Ok(CollectionIndex {
                insights: current.as_ref().and_then(stored_insights),
                ..fresh.clone()
            })
        });
        let index = match written {
            Ok((index, _)) => index,
            Err(e) => {
                tracing::warn!(target: "scan", "Failed to write collection index: {}", e);
                issues.push(ScanIssue {
                    band: COLLECTION_INDEX_FILE.to_string(),
                    message: e.to_string(),
                });
                fresh
            }
        };

        tracing::info!(
            target: "scan",
            "Scan complete: {} processed, {} fresh, {} issues",
            processed.len(),
            skipped_fresh.len(),
            issues.len()
        );

        Ok(ScanReport {
            index,
            processed,
            skipped_fresh,
            issues,
            warnings,
        })
    }

    /// Metadata for one band; analyzed on the fly if none is stored yet.
    pub fn get_band(&self, band: &str) -> Result<Band> {
        self.band_dir(band)?;
        if let Some(stored) = self.load_band(band)? {
            return Ok(stored);
        }
        let folder = self.scan_band_folder(band)?;
        Ok(self.analyzer.analyze(&folder, None).band)
    }

    /// Merge `update` into the band's stored metadata.
    ///
    /// Holds the metadata file's lock for the whole read-merge-write; an
    /// invalid result is rejected and nothing is written.
    pub fn save_band_metadata(&self, band: &str, update: BandMetadataUpdate) -> Result<SaveResult> {
        let folder = self.scan_band_folder(band)?;
        let path = self.metadata_path(band);

        let (saved, outcome) = self
            .storage
            .update(&path, |current| {
                let mut stored = match current {
                    Some(value) => band_from_value(value)?,
                    None => self.analyzer.analyze(&folder, None).band,
                };
                update.apply_to(&mut stored);
                stored.validate()?;
                Ok(stored)
            })
            .map_err(rejection_to_validation)?;

        tracing::info!(target: "storage", "Saved metadata for {}", band);
        Ok(SaveResult {
            band: saved,
            outcome,
        })
    }

    /// Analyze one band against its current folders without writing.
    ///
    /// Stored metadata, if readable, supplies known years and editions.
    pub fn analyze_band(&self, band: &str) -> Result<Band> {
        let folder = self.scan_band_folder(band)?;
        let existing = self.load_band(band).unwrap_or_else(|e| {
            tracing::warn!(target: "scan", "{}: ignoring stored metadata: {}", band, e);
            None
        });
        Ok(self.analyzer.analyze(&folder, existing.as_ref()).band)
    }

    /// Re-score one band against its current folders. Nothing is written.
    ///
    /// `None` when the band has no albums or structure analysis is disabled.
    pub fn validate_compliance(&self, band: &str) -> Result<Option<BandComplianceReport>> {
        if !self.analyzer.structure_enabled() {
            tracing::info!(target: "scan", "Structure analysis is disabled");
            return Ok(None);
        }
        Ok(self.analyze_band(band)?.compliance)
    }

    /// The stored collection index, if a scan has written one.
    pub fn collection_index(&self) -> Result<Option<CollectionIndex>> {
        match self.storage.load(&self.index_path()) {
            Ok(index) => Ok(Some(index)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Cache state of every metadata file under the root.
    pub fn cache_status(&self) -> Vec<(PathBuf, CacheStatus)> {
        tracked_files(&self.root)
            .into_iter()
            .map(|path| {
                let status = self.cache.status(&path);
                (path, status)
            })
            .collect()
    }

    /// Remove expired and corrupted metadata files.
    pub fn cleanup_cache(&self) -> CleanupReport {
        self.cache.cleanup(&self.root)
    }

    /// Apply the backup retention policy under the root.
    pub fn prune_backups(&self) -> PruneReport {
        prune_backups_under(&self.root, self.retention, Utc::now())
    }

    // ========================================================================
    // Collection index
    // ========================================================================

    fn collection_stats<'a>(&self, bands: impl Iterator<Item = &'a Band> + Clone) -> CollectionStats {
        let mut stats = CollectionStats::default();
        let mut type_distribution = BTreeMap::new();

        for band in bands.clone() {
            stats.total_bands += 1;
            stats.total_albums += band.total_albums_count();
            stats.total_local_albums += band.local_albums_count();
            stats.total_missing_albums += band.missing_albums_count();
            for album in &band.albums {
                *type_distribution.entry(album.album_type).or_insert(0) += 1;
            }
        }
        stats.type_distribution = type_distribution;

        let compliance = self.analyzer.validator().validate_collection(
            bands.filter_map(|band| band.compliance.as_ref().map(|c| (band.name.as_str(), c))),
        );
        stats.average_compliance_score = compliance.average_score;
        stats.compliance_distribution = compliance.distribution;
        stats.bands_needing_attention = compliance.bands_needing_attention;
        stats
    }
}

/// Insights from a stored index; written by other tools and kept as-is.
fn stored_insights(index: &Value) -> Option<CollectionInsights> {
    match index.get("insights") {
        None | Some(Value::Null) => None,
        Some(insights) => serde_json::from_value(insights.clone())
            .inspect_err(|e| {
                tracing::warn!(target: "storage", "Dropping unreadable collection insights: {}", e)
            })
            .ok(),
    }
}

/// Surface rejected updates as the validation error that caused them.
fn rejection_to_validation(e: StorageError) -> Error {
    match e {
        StorageError::Rejected { source, .. } => Error::Validation(source),
        other => Error::Storage(other),
    }
}
