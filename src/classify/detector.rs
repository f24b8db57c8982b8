//! Keyword-based album type detection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::model::AlbumType;

/// Type keywords in priority order. The first class with a match wins, so
/// "Live Demos" is Live and "Best of the EPs" is Compilation.
const KEYWORD_CLASSES: &[(AlbumType, &[(&str, f32)])] = &[
    (
        AlbumType::Live,
        &[("live", 0.9), ("unplugged", 0.9), ("concert", 0.8)],
    ),
    (
        AlbumType::Compilation,
        &[("greatest hits", 0.95), ("best of", 0.9), ("collection", 0.7)],
    ),
    (AlbumType::EP, &[("ep", 0.95), ("e.p.", 0.95)]),
    (AlbumType::Single, &[("single", 0.85)]),
    (
        AlbumType::Demo,
        &[("demo", 0.9), ("demos", 0.9), ("unreleased", 0.6)],
    ),
    (
        AlbumType::Instrumental,
        &[("instrumental", 0.9), ("instrumentals", 0.9)],
    ),
    (
        AlbumType::Split,
        &[("split", 0.85), ("vs.", 0.7), ("versus", 0.7)],
    ),
];

/// Confidence added when the track count fits the detected type.
const TRACK_COUNT_BONUS: f32 = 0.05;

struct KeywordMatcher {
    album_type: AlbumType,
    keyword: &'static str,
    confidence: f32,
    regex: Regex,
}

static MATCHERS: Lazy<Vec<KeywordMatcher>> = Lazy::new(|| {
    KEYWORD_CLASSES
        .iter()
        .flat_map(|(album_type, keywords)| {
            keywords.iter().map(move |(keyword, confidence)| KeywordMatcher {
                album_type: *album_type,
                keyword: *keyword,
                confidence: *confidence,
                // Word boundaries that also work for keywords ending in '.'
                regex: Regex::new(&format!(
                    r"(?i)(?:^|[^\p{{L}}\p{{N}}]){}(?:$|[^\p{{L}}\p{{N}}])",
                    regex::escape(keyword)
                ))
                .unwrap(),
            })
        })
        .collect()
});

/// Where a detection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// The album sits under a recognized type folder
    TypeFolder,
    /// A type keyword appeared in the folder name
    Keyword(&'static str),
    /// Nothing matched; plain studio album
    Default,
}

/// A proposed album type and how sure the detector is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypeDetection {
    pub album_type: AlbumType,
    pub confidence: f32,
    pub source: DetectionSource,
}

/// Inputs beyond the folder name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionContext<'a> {
    pub type_folder: Option<&'a str>,
    pub track_count: Option<u32>,
}

/// Classifies albums into one of the eight [`AlbumType`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlbumTypeDetector;

impl AlbumTypeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect the type of an album.
    ///
    /// A recognized type folder wins with confidence 1.0; otherwise the name
    /// is scanned for type keywords.
    pub fn detect(&self, folder_name: &str, context: DetectionContext<'_>) -> TypeDetection {
        if let Some(album_type) = context.type_folder.and_then(AlbumType::from_folder_name) {
            return TypeDetection {
                album_type,
                confidence: 1.0,
                source: DetectionSource::TypeFolder,
            };
        }
        self.detect_from_name(folder_name, context.track_count)
    }

    /// Keyword-only detection, ignoring any type folder.
    pub fn detect_from_name(&self, folder_name: &str, track_count: Option<u32>) -> TypeDetection {
        let Some(matcher) = MATCHERS.iter().find(|m| m.regex.is_match(folder_name)) else {
            return TypeDetection {
                album_type: AlbumType::Album,
                confidence: 1.0,
                source: DetectionSource::Default,
            };
        };

        let bonus = match track_count {
            Some(n) if fits_track_count(matcher.album_type, n) => TRACK_COUNT_BONUS,
            _ => 0.0,
        };

        TypeDetection {
            album_type: matcher.album_type,
            confidence: (matcher.confidence + bonus).min(1.0),
            source: DetectionSource::Keyword(matcher.keyword),
        }
    }
}

fn fits_track_count(album_type: AlbumType, tracks: u32) -> bool {
    match album_type {
        AlbumType::EP => (3..=7).contains(&tracks),
        AlbumType::Single => (1..=3).contains(&tracks),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(name: &str) -> TypeDetection {
        AlbumTypeDetector::new().detect(name, DetectionContext::default())
    }

    #[test]
    fn test_live_keyword() {
        let d = detect("1972 - Live at Pompeii");
        assert_eq!(d.album_type, AlbumType::Live);
        assert!(d.confidence >= 0.9);
        assert_eq!(d.source, DetectionSource::Keyword("live"));
    }

    #[test]
    fn test_no_match_is_album() {
        let d = detect("Apocalyptic Love");
        assert_eq!(d.album_type, AlbumType::Album);
        assert_eq!(d.confidence, 1.0);
        assert_eq!(d.source, DetectionSource::Default);
    }

    #[test]
    fn test_type_folder_wins() {
        let d = AlbumTypeDetector::new().detect(
            "1999 - Greatest Hits",
            DetectionContext {
                type_folder: Some("Live"),
                track_count: None,
            },
        );
        assert_eq!(d.album_type, AlbumType::Live);
        assert_eq!(d.confidence, 1.0);
        assert_eq!(d.source, DetectionSource::TypeFolder);
    }

    #[test]
    fn test_word_boundaries() {
        // "ep" inside a word must not match
        assert_eq!(detect("2003 - Deep Purple Rising").album_type, AlbumType::Album);
        assert_eq!(detect("2003 - Oliver").album_type, AlbumType::Album);
        assert_eq!(detect("2003 - Splitting Hairs").album_type, AlbumType::Album);
        assert_eq!(detect("2003 - Sunrise EP").album_type, AlbumType::EP);
        assert_eq!(detect("2003 - Sunrise (E.P.)").album_type, AlbumType::EP);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(detect("Live Demos").album_type, AlbumType::Live);
        assert_eq!(detect("Best of the EPs").album_type, AlbumType::Compilation);
        assert_eq!(detect("Greatest Hits").confidence, 0.95);
    }

    #[test]
    fn test_loose_keywords_have_low_confidence() {
        let d = detect("2005 - The Collection");
        assert_eq!(d.album_type, AlbumType::Compilation);
        assert!(d.confidence < 0.8);

        let d = detect("Band A vs. Band B");
        assert_eq!(d.album_type, AlbumType::Split);
        assert!(d.confidence < 0.8);
    }

    #[test]
    fn test_track_count_bonus() {
        let detector = AlbumTypeDetector::new();
        let plain = detector.detect_from_name("Sunrise EP", None);
        let boosted = detector.detect_from_name("Sunrise EP", Some(5));
        let too_long = detector.detect_from_name("Sunrise EP", Some(12));
        assert_eq!(plain.confidence, 0.95);
        assert!(boosted.confidence > plain.confidence);
        assert!(boosted.confidence <= 1.0);
        assert_eq!(too_long.confidence, plain.confidence);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let detector = AlbumTypeDetector::new();
        for name in ["1972 - Live at Pompeii", "Split w/ Friends", "Demo 1989", "Meddle"] {
            let first = detector.detect(name, DetectionContext::default());
            let second = detector.detect(name, DetectionContext::default());
            assert_eq!(first, second);
        }
    }
}
