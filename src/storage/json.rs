//! Locked, atomic JSON documents with backup recovery.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::backup::{create_backup, list_backups};
use super::lock::{AdvisoryFileLocker, FileLocker};
use crate::config::StorageConfig;
use crate::error::{StorageError, ValidationError};

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub path: PathBuf,
    /// Backup of the previous content, if one was made.
    pub backup: Option<PathBuf>,
    /// A previous version existed but its backup slot for this second was
    /// already taken, so it was not backed up.
    pub backup_skipped: bool,
}

/// JSON file store.
///
/// Writes hold the target's lock, back up the previous content, and replace
/// the file with a rename so readers never see a partial document. Reads
/// take no lock and fall back to the newest parseable backup.
#[derive(Debug, Clone)]
pub struct JsonStorage<L = AdvisoryFileLocker> {
    locker: L,
    lock_timeout: Duration,
}

impl JsonStorage<AdvisoryFileLocker> {
    pub fn new(lock_timeout: Duration) -> Self {
        Self::with_locker(AdvisoryFileLocker, lock_timeout)
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.lock_timeout())
    }
}

impl<L: FileLocker> JsonStorage<L> {
    pub fn with_locker(locker: L, lock_timeout: Duration) -> Self {
        Self {
            locker,
            lock_timeout,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Serialize `data` and atomically replace `path` with it.
    pub fn save<T: Serialize + ?Sized>(&self, path: &Path, data: &T) -> Result<SaveOutcome, StorageError> {
        let bytes = to_bytes(path, data)?;
        let lock = self.locker.acquire(path, self.lock_timeout)?;
        let outcome = write_locked(path, &bytes);
        self.locker.release(lock)?;
        outcome
    }

    /// Read-modify-write under one lock.
    ///
    /// `modify` receives the current document (or `None` if the file does not
    /// exist) and returns the new one. A rejection leaves the file untouched.
    pub fn update<T, F>(&self, path: &Path, modify: F) -> Result<(T, SaveOutcome), StorageError>
    where
        T: Serialize,
        F: FnOnce(Option<Value>) -> Result<T, ValidationError>,
    {
        let lock = self.locker.acquire(path, self.lock_timeout)?;
        let result = read_value(path).and_then(|current| {
            let updated = modify(current).map_err(|source| StorageError::Rejected {
                path: path.to_path_buf(),
                source,
            })?;
            let bytes = to_bytes(path, &updated)?;
            let outcome = write_locked(path, &bytes)?;
            Ok((updated, outcome))
        });
        self.locker.release(lock)?;
        result
    }

    /// Load and deserialize `path`.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StorageError> {
        let value = self.load_value(path)?;
        serde_json::from_value(value).map_err(|source| StorageError::Corrupted {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` as raw JSON, for callers that upgrade old documents.
    pub fn load_value(&self, path: &Path) -> Result<Value, StorageError> {
        read_value(path)?.ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }
}

fn to_bytes<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = serde_json::to_vec_pretty(data).map_err(|source| StorageError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse `path`, recovering from the newest valid backup if it is corrupt.
fn read_value(path: &Path) -> Result<Option<Value>, StorageError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    let error = match serde_json::from_slice(&bytes) {
        Ok(value) => return Ok(Some(value)),
        Err(e) => e,
    };

    tracing::warn!(target: "storage", "Corrupted JSON in {}: {}", path.display(), error);
    for backup in list_backups(path)? {
        let Ok(bytes) = std::fs::read(&backup.path) else {
            continue;
        };
        if let Ok(value) = serde_json::from_slice(&bytes) {
            tracing::warn!(
                target: "storage",
                "Recovered {} from backup {}",
                path.display(),
                backup.path.display()
            );
            return Ok(Some(value));
        }
    }

    Err(StorageError::Corrupted {
        path: path.to_path_buf(),
        source: error,
    })
}

/// Backup + temp file + rename. The caller must hold the lock.
fn write_locked(path: &Path, bytes: &[u8]) -> Result<SaveOutcome, StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    if let Err(e) = write_and_sync(&temp, bytes) {
        let _ = std::fs::remove_file(&temp);
        return Err(StorageError::io(&temp, e));
    }

    let existed = path.exists();
    let backup = match create_backup(path, Utc::now()) {
        Ok(backup) => backup,
        Err(e) => {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
    };

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(StorageError::io(path, e));
    }

    tracing::debug!(target: "storage", "Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(SaveOutcome {
        path: path.to_path_buf(),
        backup_skipped: existed && backup.is_none(),
        backup,
    })
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
