//! Timestamped backups: `<file>.backup.YYYYMMDD-HHMMSS`, next to the original.
//!
//! Backups are write-once. Saving never prunes them; retention is applied by
//! the explicit [`prune_backups`] / [`prune_backups_under`] passes.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::error::StorageError;

const BACKUP_MARKER: &str = ".backup.";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One backup file of a given original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub taken_at: DateTime<Utc>,
}

/// How many backups to keep per original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Newest backups kept regardless of count pressure.
    pub keep: usize,
    /// Backups older than this are removed even if within `keep`.
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    pub fn from_config(config: &crate::config::StorageConfig) -> Self {
        Self {
            keep: config.backup_keep,
            max_age: config.backup_max_age(),
        }
    }
}

/// Outcome of a pruning pass.
#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub kept: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl PruneReport {
    fn merge(&mut self, other: PruneReport) {
        self.removed.extend(other.removed);
        self.kept += other.kept;
        self.errors.extend(other.errors);
    }
}

/// Backup path for `file` taken at `at`.
pub fn backup_path(file: &Path, at: DateTime<Utc>) -> PathBuf {
    let mut name = file.file_name().unwrap_or_default().to_os_string();
    name.push(BACKUP_MARKER);
    name.push(at.format(TIMESTAMP_FORMAT).to_string());
    file.with_file_name(name)
}

/// Split a backup file name into the original file name and its timestamp.
fn parse_backup_name(name: &str) -> Option<(&str, DateTime<Utc>)> {
    let (original, stamp) = name.rsplit_once(BACKUP_MARKER)?;
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((original, naive.and_utc()))
}

/// Copy `file` to a fresh backup.
///
/// Returns `None` if `file` does not exist, or if a backup with the same
/// timestamp already exists (that one is kept untouched).
pub fn create_backup(file: &Path, at: DateTime<Utc>) -> Result<Option<PathBuf>, StorageError> {
    if !file.exists() {
        return Ok(None);
    }
    let target = backup_path(file, at);
    if target.exists() {
        tracing::warn!(
            target: "storage",
            "Backup {} already exists; previous content of {} not backed up",
            target.display(),
            file.display()
        );
        return Ok(None);
    }
    std::fs::copy(file, &target).map_err(|e| StorageError::io(&target, e))?;
    tracing::debug!(target: "storage", "Backed up {} to {}", file.display(), target.display());
    Ok(Some(target))
}

/// Backups of `file`, newest first.
pub fn list_backups(file: &Path) -> Result<Vec<Backup>, StorageError> {
    let Some(dir) = file.parent() else {
        return Ok(Vec::new());
    };
    let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    let mut backups: Vec<Backup> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let (original, taken_at) = parse_backup_name(name.to_str()?)?;
            (original == file_name).then(|| Backup {
                path: entry.path(),
                taken_at,
            })
        })
        .collect();

    backups.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
    Ok(backups)
}

/// Apply `policy` to the backups of one file.
pub fn prune_backups(
    file: &Path,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<PruneReport, StorageError> {
    let mut report = PruneReport::default();

    for (i, backup) in list_backups(file)?.into_iter().enumerate() {
        let too_old = policy.max_age.is_some_and(|max_age| {
            (now - backup.taken_at)
                .to_std()
                .is_ok_and(|age| age > max_age)
        });

        if i < policy.keep && !too_old {
            report.kept += 1;
            continue;
        }

        match std::fs::remove_file(&backup.path) {
            Ok(()) => {
                tracing::debug!(target: "storage", "Pruned backup {}", backup.path.display());
                report.removed.push(backup.path);
            }
            Err(e) => report.errors.push((backup.path, e.to_string())),
        }
    }

    Ok(report)
}

/// Apply `policy` to every backed-up file under `root`.
pub fn prune_backups_under(root: &Path, policy: RetentionPolicy, now: DateTime<Utc>) -> PruneReport {
    let originals: BTreeSet<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let (original, _) = parse_backup_name(name)?;
            Some(entry.path().with_file_name(original))
        })
        .collect();

    let mut report = PruneReport::default();
    for original in originals {
        match prune_backups(&original, policy, now) {
            Ok(r) => report.merge(r),
            Err(e) => report.errors.push((original, e.to_string())),
        }
    }

    tracing::info!(
        target: "storage",
        "Pruned {} backups under {} ({} kept)",
        report.removed.len(),
        root.display(),
        report.kept
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_backup_name_format() {
        let path = backup_path(Path::new("/m/Band/.band_metadata.json"), at(5, 14));
        assert_eq!(
            path,
            PathBuf::from("/m/Band/.band_metadata.json.backup.20240305-140000")
        );
        let (original, when) =
            parse_backup_name(".band_metadata.json.backup.20240305-140000").unwrap();
        assert_eq!(original, ".band_metadata.json");
        assert_eq!(when, at(5, 14));
    }

    #[test]
    fn test_unrelated_names_ignored() {
        assert!(parse_backup_name(".band_metadata.json").is_none());
        assert!(parse_backup_name("notes.backup.yesterday").is_none());
    }

    #[test]
    fn test_create_backup_is_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.json");

        assert_eq!(create_backup(&file, at(1, 0)).unwrap(), None);

        std::fs::write(&file, "first").unwrap();
        let backup = create_backup(&file, at(1, 0)).unwrap().unwrap();
        std::fs::write(&file, "second").unwrap();
        assert_eq!(create_backup(&file, at(1, 0)).unwrap(), None);
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "first");
    }

    #[test]
    fn test_list_backups_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.json");
        std::fs::write(&file, "{}").unwrap();
        for day in [3, 1, 2] {
            create_backup(&file, at(day, 0)).unwrap();
        }
        std::fs::write(dir.path().join("other.json.backup.20240310-000000"), "{}").unwrap();

        let backups = list_backups(&file).unwrap();
        let days: Vec<_> = backups.iter().map(|b| b.taken_at).collect();
        assert_eq!(days, vec![at(3, 0), at(2, 0), at(1, 0)]);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.json");
        std::fs::write(&file, "{}").unwrap();
        for day in 1..=5 {
            create_backup(&file, at(day, 0)).unwrap();
        }

        let policy = RetentionPolicy {
            keep: 2,
            max_age: None,
        };
        let report = prune_backups(&file, policy, at(6, 0)).unwrap();
        assert_eq!(report.removed.len(), 3);
        assert_eq!(report.kept, 2);
        let left: Vec<_> = list_backups(&file)
            .unwrap()
            .into_iter()
            .map(|b| b.taken_at)
            .collect();
        assert_eq!(left, vec![at(5, 0), at(4, 0)]);
        assert!(file.exists());
    }

    #[test]
    fn test_prune_drops_old_backups() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.json");
        std::fs::write(&file, "{}").unwrap();
        create_backup(&file, at(1, 0)).unwrap();
        create_backup(&file, at(20, 0)).unwrap();

        let policy = RetentionPolicy {
            keep: 10,
            max_age: Some(Duration::from_secs(7 * 24 * 3600)),
        };
        let report = prune_backups(&file, policy, at(21, 0)).unwrap();
        assert_eq!(report.removed.len(), 1);
        assert_eq!(list_backups(&file).unwrap()[0].taken_at, at(20, 0));
    }

    #[test]
    fn test_prune_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A").join(".band_metadata.json");
        let b = dir.path().join("B").join(".band_metadata.json");
        for file in [&a, &b] {
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, "{}").unwrap();
            for day in 1..=3 {
                create_backup(file, at(day, 0)).unwrap();
            }
        }

        let policy = RetentionPolicy {
            keep: 1,
            max_age: None,
        };
        let report = prune_backups_under(dir.path(), policy, at(4, 0));
        assert_eq!(report.removed.len(), 4);
        assert_eq!(report.kept, 2);
        assert!(report.errors.is_empty());
    }
}
