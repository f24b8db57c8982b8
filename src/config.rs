//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\music-catalog\config.toml
//! - macOS: ~/Library/Application Support/music-catalog/config.toml
//! - Linux: ~/.config/music-catalog/config.toml
//!
//! Environment variables override file values:
//!
//! | Variable | Field |
//! |---|---|
//! | `MUSIC_ROOT_PATH` | `library.music_root` |
//! | `CACHE_DURATION_DAYS` | `cache.duration_days` |
//! | `ENABLE_TYPE_DETECTION` | `detection.enable_type_detection` |
//! | `TYPE_DETECTION_CONFIDENCE` | `detection.confidence_threshold` |
//! | `DEFAULT_ALBUM_TYPE` | `detection.default_album_type` |
//! | `ENABLE_STRUCTURE_ANALYSIS` | `structure.enable_structure_analysis` |
//! | `COMPLIANCE_THRESHOLD` | `structure.compliance_threshold` |
//!
//! The resulting [`Config`] is built once and handed to
//! [`crate::library::Catalog::new`]; nothing reads it from global state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::model::AlbumType;

/// Catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub cache: CacheConfig,
    pub detection: DetectionConfig,
    pub structure: StructureConfig,
    pub storage: StorageConfig,
}

/// Library location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root folder containing one directory per band
    pub music_root: Option<PathBuf>,
}

/// Metadata freshness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Days before stored metadata is rescanned (0 disables caching)
    pub duration_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { duration_days: 30 }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_days) * 24 * 60 * 60)
    }
}

/// Album type detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub enable_type_detection: bool,
    /// Minimum confidence (0.0 - 1.0) to accept a detected type
    pub confidence_threshold: f32,
    /// Type used when detection is off or not confident enough
    pub default_album_type: AlbumType,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enable_type_detection: true,
            confidence_threshold: 0.8,
            default_album_type: AlbumType::Album,
        }
    }
}

/// Structure analysis and compliance scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub enable_structure_analysis: bool,
    /// Bands scoring below this are flagged as needing attention
    pub compliance_threshold: u8,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            enable_structure_analysis: true,
            compliance_threshold: 75,
        }
    }
}

/// Persistence tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// How long a save waits for another writer before giving up
    pub lock_timeout_ms: u64,
    /// Backups kept per metadata file by `prune-backups`
    pub backup_keep: usize,
    /// Backups older than this are pruned regardless of count (0 = no age limit)
    pub backup_max_age_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
            backup_keep: 5,
            backup_max_age_days: 90,
        }
    }
}

impl StorageConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn backup_max_age(&self) -> Option<Duration> {
        (self.backup_max_age_days > 0)
            .then(|| Duration::from_secs(u64::from(self.backup_max_age_days) * 24 * 60 * 60))
    }
}

impl Config {
    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("MUSIC_ROOT_PATH").filter(|v| !v.trim().is_empty()) {
            self.library.music_root = Some(PathBuf::from(root));
        }
        override_parsed(&lookup, "CACHE_DURATION_DAYS", &mut self.cache.duration_days);
        override_bool(
            &lookup,
            "ENABLE_TYPE_DETECTION",
            &mut self.detection.enable_type_detection,
        );
        let mut confidence = self.detection.confidence_threshold;
        override_parsed(&lookup, "TYPE_DETECTION_CONFIDENCE", &mut confidence);
        if confidence.is_finite() {
            self.detection.confidence_threshold = confidence;
        } else {
            tracing::warn!(
                target: "config",
                "Ignoring TYPE_DETECTION_CONFIDENCE={}: not a finite number",
                confidence
            );
        }
        override_parsed(
            &lookup,
            "DEFAULT_ALBUM_TYPE",
            &mut self.detection.default_album_type,
        );
        override_bool(
            &lookup,
            "ENABLE_STRUCTURE_ANALYSIS",
            &mut self.structure.enable_structure_analysis,
        );
        override_parsed(
            &lookup,
            "COMPLIANCE_THRESHOLD",
            &mut self.structure.compliance_threshold,
        );

        // NaN from the config file would reject every detection
        if !self.detection.confidence_threshold.is_finite() {
            tracing::warn!(
                target: "config",
                "Confidence threshold is not a finite number, using the default"
            );
            self.detection.confidence_threshold = DetectionConfig::default().confidence_threshold;
        }
        let clamped = self.detection.confidence_threshold.clamp(0.0, 1.0);
        if clamped != self.detection.confidence_threshold {
            tracing::warn!(
                target: "config",
                "TYPE_DETECTION_CONFIDENCE {} outside 0.0-1.0, clamped to {}",
                self.detection.confidence_threshold,
                clamped
            );
            self.detection.confidence_threshold = clamped;
        }
        if self.structure.compliance_threshold > 100 {
            tracing::warn!(target: "config", "COMPLIANCE_THRESHOLD above 100, clamped");
            self.structure.compliance_threshold = 100;
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env(mut self) -> Self {
        self.apply_env_overrides(|key| std::env::var(key).ok());
        self
    }
}

fn override_parsed<T, F>(lookup: &F, key: &str, target: &mut T)
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(e) => tracing::warn!(target: "config", "Ignoring {}={:?}: {}", key, raw, e),
    }
}

fn override_bool<F>(lookup: &F, key: &str, target: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => *target = true,
        "0" | "false" | "no" | "off" => *target = false,
        _ => tracing::warn!(target: "config", "Ignoring {}={:?}: not a boolean", key, raw),
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("music-catalog"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!(target: "config", "Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_from(path: &std::path::Path) -> Config {
    if !path.exists() {
        tracing::info!(target: "config", "No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!(target: "config", "Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!(target: "config", "Failed to parse config file {:?}: {}", path, e);
                tracing::warn!(target: "config", "Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!(target: "config", "Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &dir.join("config.toml"))
}

/// Save configuration to a specific file.
pub fn save_to(config: &Config, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!(target: "config", "Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[detection]"));
        assert!(toml.contains("[structure]"));
        assert!(toml.contains("[storage]"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.duration_days, 30);
        assert_eq!(config.detection.confidence_threshold, 0.8);
        assert_eq!(config.detection.default_album_type, AlbumType::Album);
        assert!(config.structure.enable_structure_analysis);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[cache]
duration_days = 7
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.duration_days, 7);
        assert_eq!(config.detection.confidence_threshold, 0.8);
        assert_eq!(config.storage.backup_keep, 5);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("MUSIC_ROOT_PATH", "/srv/music"),
            ("CACHE_DURATION_DAYS", "0"),
            ("ENABLE_TYPE_DETECTION", "false"),
            ("TYPE_DETECTION_CONFIDENCE", "0.6"),
            ("DEFAULT_ALBUM_TYPE", "EP"),
            ("COMPLIANCE_THRESHOLD", "60"),
        ]));
        assert_eq!(config.library.music_root, Some(PathBuf::from("/srv/music")));
        assert_eq!(config.cache.duration_days, 0);
        assert!(!config.detection.enable_type_detection);
        assert_eq!(config.detection.confidence_threshold, 0.6);
        assert_eq!(config.detection.default_album_type, AlbumType::EP);
        assert_eq!(config.structure.compliance_threshold, 60);
    }

    #[test]
    fn test_invalid_env_values_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("CACHE_DURATION_DAYS", "thirty"),
            ("ENABLE_STRUCTURE_ANALYSIS", "maybe"),
            ("DEFAULT_ALBUM_TYPE", "Bootleg"),
            ("TYPE_DETECTION_CONFIDENCE", "1.7"),
        ]));
        assert_eq!(config.cache.duration_days, 30);
        assert!(config.structure.enable_structure_analysis);
        assert_eq!(config.detection.default_album_type, AlbumType::Album);
        assert_eq!(config.detection.confidence_threshold, 1.0);
    }

    #[test]
    fn test_non_finite_confidence_ignored() {
        for raw in ["NaN", "nan", "inf", "-inf"] {
            let mut config = Config::default();
            config.detection.confidence_threshold = 0.6;
            config.apply_env_overrides(env(&[("TYPE_DETECTION_CONFIDENCE", raw)]));
            assert_eq!(config.detection.confidence_threshold, 0.6, "{raw}");
        }
    }

    #[test]
    fn test_nan_from_file_reset_to_default() {
        let mut config = Config::default();
        config.detection.confidence_threshold = f32::NAN;
        config.apply_env_overrides(env(&[]));
        assert_eq!(config.detection.confidence_threshold, 0.8);
    }

    #[test]
    fn test_zero_cache_duration_is_zero_max_age() {
        let config = CacheConfig { duration_days: 0 };
        assert_eq!(config.max_age(), Duration::ZERO);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.library.music_root = Some(PathBuf::from("/music"));
        config.detection.default_album_type = AlbumType::Live;

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path);
        assert_eq!(loaded.library.music_root, Some(PathBuf::from("/music")));
        assert_eq!(loaded.detection.default_album_type, AlbumType::Live);
    }

    #[test]
    fn test_unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache\nduration_days = ").unwrap();
        let loaded = load_from(&path);
        assert_eq!(loaded.cache.duration_days, 30);
    }
}
