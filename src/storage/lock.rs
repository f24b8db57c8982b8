//! Cross-process advisory locks on metadata files.
//!
//! The lock lives on a sidecar `<file>.lock` next to the protected file so the
//! protected file itself can be atomically replaced while the lock is held.
//! The sidecar is never deleted; an abandoned sidecar without an OS lock on it
//! does not block anyone.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::StorageError;

/// Interval between lock attempts while waiting for another writer.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Mutual exclusion scoped to a single file path.
///
/// Implementations must give up with [`StorageError::LockTimeout`] rather
/// than block past `timeout`.
pub trait FileLocker {
    type Lock;

    fn acquire(&self, path: &Path, timeout: Duration) -> Result<Self::Lock, StorageError>;

    fn release(&self, lock: Self::Lock) -> Result<(), StorageError>;
}

/// OS advisory locks (`flock` on Unix, `LockFileEx` on Windows) via `fs2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryFileLocker;

/// Held lock; released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    released: bool,
}

impl FileLock {
    /// Path of the sidecar lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unlock(&mut self) -> std::io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        FileExt::unlock(&self.file)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.unlock() {
            tracing::warn!(target: "storage", "Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

/// Sidecar lock path for `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

impl FileLocker for AdvisoryFileLocker {
    type Lock = FileLock;

    fn acquire(&self, path: &Path, timeout: Duration) -> Result<FileLock, StorageError> {
        let lock_path = lock_path(path);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StorageError::io(&lock_path, e))?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::trace!(target: "storage", "Acquired lock {}", lock_path.display());
                    return Ok(FileLock {
                        file,
                        path: lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::warn!(
                            target: "storage",
                            "Gave up waiting for lock {} after {:?}",
                            lock_path.display(),
                            timeout
                        );
                        return Err(StorageError::LockTimeout {
                            path: path.to_path_buf(),
                            timeout,
                        });
                    }
                    tracing::debug!(target: "storage", "Lock {} is held, retrying", lock_path.display());
                    std::thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
                Err(e) => return Err(StorageError::io(&lock_path, e)),
            }
        }
    }

    fn release(&self, mut lock: FileLock) -> Result<(), StorageError> {
        lock.unlock().map_err(|e| StorageError::io(&lock.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_is_sidecar() {
        let path = Path::new("/music/Band/.band_metadata.json");
        assert_eq!(
            lock_path(path),
            PathBuf::from("/music/Band/.band_metadata.json.lock")
        );
    }

    #[test]
    fn test_second_acquire_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.json");
        let locker = AdvisoryFileLocker;

        let held = locker.acquire(&target, Duration::from_millis(100)).unwrap();
        let start = Instant::now();
        let err = locker
            .acquire(&target, Duration::from_millis(100))
            .unwrap_err();
        assert!(err.is_lock_timeout());
        assert!(start.elapsed() >= Duration::from_millis(100));

        locker.release(held).unwrap();
        assert!(locker.acquire(&target, Duration::from_millis(100)).is_ok());
    }

    #[test]
    fn test_drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.json");
        let locker = AdvisoryFileLocker;

        {
            let _held = locker.acquire(&target, Duration::ZERO).unwrap();
        }
        assert!(locker.acquire(&target, Duration::ZERO).is_ok());
    }

    #[test]
    fn test_abandoned_sidecar_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.json");
        std::fs::write(lock_path(&target), b"").unwrap();
        assert!(AdvisoryFileLocker.acquire(&target, Duration::ZERO).is_ok());
    }

    #[test]
    fn test_waiter_gets_lock_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.json");
        let locker = AdvisoryFileLocker;
        let held = locker.acquire(&target, Duration::ZERO).unwrap();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| locker.acquire(&target, Duration::from_secs(5)));
            std::thread::sleep(Duration::from_millis(50));
            drop(held);
            assert!(waiter.join().unwrap().is_ok());
        });
    }
}
