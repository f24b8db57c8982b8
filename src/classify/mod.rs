//! Album type classification.
//!
//! [`AlbumTypeDetector`] proposes a type with a confidence. [`TypeClassifier`]
//! applies the configured policy on top: detection can be switched off, and
//! proposals below the confidence threshold fall back to the default type.
//! The proposal is always kept as a [`DetectionRecord`] for diagnostics.

mod detector;

pub use detector::{AlbumTypeDetector, DetectionContext, DetectionSource, TypeDetection};

use crate::config::DetectionConfig;
use crate::model::{AlbumType, DetectionRecord};

/// Final type for an album plus what the detector originally proposed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub album_type: AlbumType,
    /// `None` when detection is disabled.
    pub detection: Option<TypeDetection>,
    /// The detection met the confidence threshold.
    pub accepted: bool,
}

impl Classification {
    pub fn record(&self) -> Option<DetectionRecord> {
        self.detection.map(|d| DetectionRecord {
            detected: d.album_type,
            confidence: d.confidence,
            accepted: self.accepted,
        })
    }
}

/// Config-aware wrapper around [`AlbumTypeDetector`].
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    detector: AlbumTypeDetector,
    enabled: bool,
    threshold: f32,
    default_type: AlbumType,
}

impl TypeClassifier {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            detector: AlbumTypeDetector::new(),
            enabled: config.enable_type_detection,
            threshold: config.confidence_threshold,
            default_type: config.default_album_type,
        }
    }

    pub fn detector(&self) -> &AlbumTypeDetector {
        &self.detector
    }

    pub fn classify(&self, folder_name: &str, context: DetectionContext<'_>) -> Classification {
        if !self.enabled {
            return Classification {
                album_type: self.default_type,
                detection: None,
                accepted: false,
            };
        }

        let detection = self.detector.detect(folder_name, context);
        let accepted = detection.confidence >= self.threshold;
        let album_type = if accepted {
            detection.album_type
        } else {
            tracing::debug!(
                target: "scan",
                "Detected {} for '{}' at {:.2}, below threshold {:.2}; using {}",
                detection.album_type,
                folder_name,
                detection.confidence,
                self.threshold,
                self.default_type
            );
            self.default_type
        };

        Classification {
            album_type,
            detection: Some(detection),
            accepted,
        }
    }
}
