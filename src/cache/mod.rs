//! Freshness of stored metadata.
//!
//! Every `.band_metadata.json` and `.collection_index.json` doubles as a
//! cache entry: its embedded timestamp (`last_updated` / `last_scan`, or the
//! file mtime when absent) decides whether a rescan is needed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::error::CacheError;
use crate::model::{BAND_METADATA_FILE, COLLECTION_INDEX_FILE};

/// Timestamp fields checked, in order.
const TIMESTAMP_FIELDS: [&str; 2] = ["last_updated", "last_scan"];

/// State of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Valid,
    Expired,
    Corrupted,
    Missing,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Valid => "valid",
            CacheStatus::Expired => "expired",
            CacheStatus::Corrupted => "corrupted",
            CacheStatus::Missing => "missing",
        }
    }

    /// Entries that should be rebuilt.
    pub fn needs_refresh(&self) -> bool {
        !matches!(self, CacheStatus::Valid)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`CacheManager::cleanup`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub scanned: usize,
    pub removed: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
}

/// True iff an entry written at `timestamp` is younger than `max_age`.
///
/// A zero `max_age` disables caching: nothing is ever valid.
pub fn is_valid(timestamp: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    if max_age.is_zero() {
        return false;
    }
    match chrono::Duration::from_std(max_age) {
        Ok(max_age) => now - timestamp < max_age,
        // Longer than chrono can represent
        Err(_) => true,
    }
}

/// Decides whether stored metadata can be reused.
#[derive(Debug, Clone, Copy)]
pub struct CacheManager {
    max_age: Duration,
}

impl CacheManager {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn from_config(config: &crate::config::CacheConfig) -> Self {
        Self::new(config.max_age())
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn is_valid(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        is_valid(timestamp, now, self.max_age)
    }

    pub fn status(&self, path: &Path) -> CacheStatus {
        self.status_at(path, Utc::now())
    }

    pub fn status_at(&self, path: &Path, now: DateTime<Utc>) -> CacheStatus {
        match entry_timestamp(path) {
            Ok(None) => CacheStatus::Missing,
            Ok(Some(ts)) if self.is_valid(ts, now) => CacheStatus::Valid,
            Ok(Some(_)) => CacheStatus::Expired,
            Err(e) => {
                tracing::warn!(target: "cache", "{}", e);
                CacheStatus::Corrupted
            }
        }
    }

    /// Remove expired and corrupted metadata files under `root`.
    ///
    /// Valid entries and backups are never touched.
    pub fn cleanup(&self, root: &Path) -> CleanupReport {
        self.cleanup_at(root, Utc::now())
    }

    pub fn cleanup_at(&self, root: &Path, now: DateTime<Utc>) -> CleanupReport {
        let mut report = CleanupReport::default();

        for path in tracked_files(root) {
            report.scanned += 1;
            let status = self.status_at(&path, now);
            if !matches!(status, CacheStatus::Expired | CacheStatus::Corrupted) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(target: "cache", "Removed {} entry {}", status, path.display());
                    report.removed.push(path);
                }
                Err(e) => {
                    tracing::warn!(target: "cache", "Failed to remove {}: {}", path.display(), e);
                    report.errors.push((path, e.to_string()));
                }
            }
        }

        report
    }
}

/// Metadata files under `root` that act as cache entries.
pub fn tracked_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name();
            name == OsStr::new(BAND_METADATA_FILE) || name == OsStr::new(COLLECTION_INDEX_FILE)
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Timestamp of a cache entry, `None` if the file does not exist.
fn entry_timestamp(path: &Path) -> Result<Option<DateTime<Utc>>, CacheError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let value: Value = serde_json::from_slice(&bytes).map_err(|source| CacheError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;

    let embedded = TIMESTAMP_FIELDS
        .iter()
        .find_map(|field| value.get(*field).filter(|v| !v.is_null()));

    match embedded {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|_| CacheError::InvalidTimestamp {
                path: path.to_path_buf(),
                value: s.clone(),
            }),
        Some(other) => Err(CacheError::InvalidTimestamp {
            path: path.to_path_buf(),
            value: other.to_string(),
        }),
        None => {
            let modified = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .map_err(|source| CacheError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Some(DateTime::<Utc>::from(modified)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn write_entry(dir: &Path, name: &str, ts: DateTime<Utc>) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let doc = serde_json::json!({"band_name": "X", "last_updated": ts.to_rfc3339()});
        std::fs::write(&path, doc.to_string()).unwrap();
        path
    }

    #[test]
    fn test_boundary_thirty_days() {
        let max_age = 30 * DAY;
        let exactly = now() - chrono::Duration::days(30);
        let one_short = now() - chrono::Duration::days(29);
        assert!(!is_valid(exactly, now(), max_age));
        assert!(is_valid(one_short, now(), max_age));
    }

    #[test]
    fn test_zero_duration_disables_cache() {
        assert!(!is_valid(now(), now(), Duration::ZERO));
    }

    #[test]
    fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(30 * DAY);

        let fresh = write_entry(dir.path(), "fresh.json", now() - chrono::Duration::days(1));
        let stale = write_entry(dir.path(), "stale.json", now() - chrono::Duration::days(31));
        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{\"last_updated\": ").unwrap();

        assert_eq!(cache.status_at(&fresh, now()), CacheStatus::Valid);
        assert_eq!(cache.status_at(&stale, now()), CacheStatus::Expired);
        assert_eq!(cache.status_at(&corrupt, now()), CacheStatus::Corrupted);
        assert_eq!(
            cache.status_at(&dir.path().join("absent.json"), now()),
            CacheStatus::Missing
        );
    }

    #[test]
    fn test_bad_timestamp_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.json");
        std::fs::write(&path, r#"{"last_updated": "last tuesday"}"#).unwrap();
        assert_eq!(
            CacheManager::new(30 * DAY).status_at(&path, now()),
            CacheStatus::Corrupted
        );
    }

    #[test]
    fn test_collection_index_uses_last_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COLLECTION_INDEX_FILE);
        let doc = serde_json::json!({"bands": [], "last_scan": now().to_rfc3339()});
        std::fs::write(&path, doc.to_string()).unwrap();
        assert_eq!(
            CacheManager::new(DAY).status_at(&path, now()),
            CacheStatus::Valid
        );
    }

    #[test]
    fn test_mtime_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.json");
        std::fs::write(&path, r#"{"band_name": "X"}"#).unwrap();
        assert_eq!(CacheManager::new(DAY).status(&path), CacheStatus::Valid);
    }

    #[test]
    fn test_cleanup_removes_only_stale_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let fresh = write_entry(root, &format!("A/{BAND_METADATA_FILE}"), now());
        let stale = write_entry(
            root,
            &format!("B/{BAND_METADATA_FILE}"),
            now() - chrono::Duration::days(90),
        );
        let corrupt = root.join("C").join(BAND_METADATA_FILE);
        std::fs::create_dir_all(corrupt.parent().unwrap()).unwrap();
        std::fs::write(&corrupt, "nope").unwrap();
        let backup = root
            .join("B")
            .join(format!("{BAND_METADATA_FILE}.backup.20240101-000000"));
        std::fs::write(&backup, "nope").unwrap();

        let report = CacheManager::new(30 * DAY).cleanup_at(root, now());
        assert_eq!(report.scanned, 3);
        assert_eq!(report.removed.len(), 2);
        assert!(fresh.exists());
        assert!(!stale.exists());
        assert!(!corrupt.exists());
        assert!(backup.exists());
    }
}
