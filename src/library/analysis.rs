//! Per-band analysis: parse, classify, detect structure, score compliance.

use chrono::Utc;
use std::path::Path;

use crate::classify::{DetectionContext, DetectionSource, TypeClassifier, TypeDetection};
use crate::compliance::{AlbumContext, ComplianceValidator};
use crate::config::Config;
use crate::model::{Album, AlbumType, Band, CURRENT_SCHEMA_VERSION, StructureType};
use crate::parser::{FolderNameParser, NamingPattern, ParseContext, ParseResult};
use crate::scanner::{AlbumFolder, BandFolder};
use crate::structure::{BandStructureDetector, dominant_pattern};

/// Result of analyzing one band folder.
#[derive(Debug, Clone)]
pub struct AnalyzedBand {
    pub band: Band,
    /// Folder names that only parsed as legacy, or sat in odd places.
    pub warnings: Vec<String>,
}

/// Runs every classification stage for one band.
#[derive(Debug, Clone)]
pub struct BandAnalyzer {
    parser: FolderNameParser,
    classifier: TypeClassifier,
    structure: BandStructureDetector,
    validator: ComplianceValidator,
    structure_enabled: bool,
}

struct ParsedAlbum<'a> {
    folder: &'a AlbumFolder,
    parse: ParseResult,
    known: Option<&'a Album>,
}

impl BandAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            parser: FolderNameParser::new(),
            classifier: TypeClassifier::new(&config.detection),
            structure: BandStructureDetector::new(),
            validator: ComplianceValidator::from_config(config),
            structure_enabled: config.structure.enable_structure_analysis,
        }
    }

    pub fn validator(&self) -> &ComplianceValidator {
        &self.validator
    }

    pub fn structure_enabled(&self) -> bool {
        self.structure_enabled
    }

    /// Analyze `folder`, carrying user-maintained fields over from `existing`.
    ///
    /// The local album list is rebuilt from disk; missing albums that turned
    /// up locally are dropped from `albums_missing`.
    pub fn analyze(&self, folder: &BandFolder, existing: Option<&Band>) -> AnalyzedBand {
        let mut warnings = Vec::new();

        let parsed: Vec<ParsedAlbum<'_>> = folder
            .albums
            .iter()
            .map(|album| {
                let context = match album.type_folder.as_deref() {
                    Some(tf) => ParseContext::in_type_folder(tf),
                    None => ParseContext::flat(),
                };
                let parse = self.parser.parse(&album.folder_name, context);
                for warning in &parse.warnings {
                    warnings.push(format!("{}: {}", folder.name, warning));
                }
                let known = existing.and_then(|band| find_known(band, &parse));
                ParsedAlbum {
                    folder: album,
                    parse,
                    known,
                }
            })
            .collect();

        let parses: Vec<ParseResult> = parsed.iter().map(|p| p.parse.clone()).collect();
        let folder_structure = self
            .structure_enabled
            .then(|| self.structure.detect(&parses));
        let dominant = folder_structure
            .as_ref()
            .filter(|s| s.structure_type != StructureType::Unknown)
            .map(|s| dominant_pattern(&s.pattern_counts));
        let enhanced_structure = dominant == Some(NamingPattern::Enhanced);

        let mut results = Vec::with_capacity(parsed.len());
        let albums: Vec<Album> = parsed
            .iter()
            .map(|p| {
                let mut album = self.build_album(folder, p);
                if self.structure_enabled {
                    let assigned = TypeDetection {
                        album_type: album.album_type,
                        confidence: album.detection.map_or(1.0, |d| d.confidence),
                        source: DetectionSource::Default,
                    };
                    let context = AlbumContext {
                        enhanced_structure,
                        dominant_pattern: dominant,
                        known_edition: p.known.and_then(|k| k.edition.as_deref()),
                        known_year: p.known.and_then(|k| k.year),
                    };
                    let result = self.validator.validate_album(&p.parse, &assigned, &context);
                    results.push(result.clone());
                    album.compliance = Some(result);
                }
                album
            })
            .collect();

        let mut band = existing
            .cloned()
            .unwrap_or_else(|| Band::new(folder.name.clone()));
        band.replace_local_albums(albums);
        band.folder_structure = folder_structure;
        band.compliance = if self.structure_enabled {
            self.validator.validate_band(&results)
        } else {
            None
        };
        band.last_updated = Utc::now();
        band.schema_version = CURRENT_SCHEMA_VERSION;

        AnalyzedBand { band, warnings }
    }

    fn build_album(&self, band: &BandFolder, parsed: &ParsedAlbum<'_>) -> Album {
        let ParsedAlbum {
            folder,
            parse,
            known,
        } = parsed;

        let classification = self.classifier.classify(
            &folder.folder_name,
            DetectionContext {
                type_folder: folder.type_folder.as_deref(),
                track_count: Some(folder.track_count),
            },
        );

        // Without folder or keyword evidence, a stored type beats the fallback
        let has_evidence = classification.accepted
            && classification
                .detection
                .is_some_and(|d| !matches!(d.source, DetectionSource::Default));
        let album_type = match known {
            Some(k) if !has_evidence && k.album_type != AlbumType::default() => k.album_type,
            _ => classification.album_type,
        };

        Album {
            name: parse.title.clone(),
            year: parse.year.or_else(|| known.and_then(|k| k.year)),
            edition: parse
                .edition
                .clone()
                .or_else(|| known.and_then(|k| k.edition.clone())),
            album_type,
            track_count: Some(folder.track_count),
            folder_path: Some(relative_path(&band.path, &folder.path)),
            compliance: None,
            detection: classification.record(),
        }
    }
}

/// Stored album matching a parsed folder, by `(title, year)` or by title
/// alone when the folder name has no year.
fn find_known<'a>(band: &'a Band, parse: &ParseResult) -> Option<&'a Album> {
    let title = parse.title.trim().to_lowercase();
    band.albums
        .iter()
        .chain(band.albums_missing.iter())
        .find(|album| {
            let key = album.key();
            key.name == title && (parse.year.is_none() || key.year == parse.year)
        })
}

/// `album` relative to `band`, with `/` separators.
fn relative_path(band: &Path, album: &Path) -> String {
    let relative = album.strip_prefix(band).unwrap_or(album);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
