//! Persistence of metadata documents.
//!
//! - [`lock`]: cross-process advisory locks behind the [`FileLocker`] trait
//! - [`backup`]: timestamped backups and retention
//! - [`json`]: atomic, locked JSON reads and writes

pub mod backup;
pub mod json;
pub mod lock;

pub use backup::{Backup, PruneReport, RetentionPolicy, prune_backups, prune_backups_under};
pub use json::{JsonStorage, SaveOutcome};
pub use lock::{AdvisoryFileLocker, FileLock, FileLocker};
