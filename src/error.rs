//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the catalog.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level catalog error enum
//! - [`StorageError`]: lock contention, disk I/O, unrecoverable JSON corruption
//! - [`ValidationError`]: metadata rejected before it reaches the disk
//! - [`CacheError`]: unreadable cache entries (degraded to "expired" by callers)
//!
//! Folder-name parse problems are not errors at all; see
//! [`crate::parser::ParseError`], which is attached to parse results as a warning.
//!
//! # Example
//!
//! ```ignore
//! use music_catalog::error::{Error, Result};
//!
//! fn refresh(catalog: &Catalog, band: &str) -> Result<()> {
//!     let report = catalog.validate_compliance(band)?; // Storage errors auto-convert
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Catalog-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level catalog error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Metadata rejected by schema validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Band folder does not exist under the music root
    #[error("Band not found: {0}")]
    BandNotFound(String),

    /// File or directory not found
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a band-not-found error.
    pub fn band_not_found(name: impl Into<String>) -> Self {
        Self::BandNotFound(name.into())
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, StorageError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Storage(e).context(ctx))
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Errors raised by the JSON persistence layer.
///
/// Whenever one of these is returned from a save, the destination file is
/// still in its last-good state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Timed out after {timeout:?} waiting for lock on {path}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize data for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupted JSON in {path} and no valid backup: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// The read-modify-write callback rejected the data.
    #[error("Update rejected for {path}: {source}")]
    Rejected {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True if this error was caused by another writer holding the lock.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Metadata that violates a schema constraint.
///
/// Every variant names the offending field so callers can report it precisely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: rating {value} is outside 1-10")]
    RatingOutOfRange { field: String, value: i64 },

    #[error("{field}: year {value} is outside 1950-2030")]
    YearOutOfRange { field: String, value: i64 },

    #[error("{field}: must not be empty")]
    Empty { field: String },

    #[error("{field}: album '{name}' ({year}) appears in both local and missing albums")]
    DuplicateAlbum {
        field: String,
        name: String,
        year: String,
    },

    #[error("{field}: {message}")]
    Malformed { field: String, message: String },
}

impl ValidationError {
    /// The field that failed validation.
    pub fn field(&self) -> &str {
        match self {
            Self::RatingOutOfRange { field, .. }
            | Self::YearOutOfRange { field, .. }
            | Self::Empty { field }
            | Self::DuplicateAlbum { field, .. }
            | Self::Malformed { field, .. } => field,
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// A cache entry that could not be read.
///
/// Never propagated as a hard failure: the cache manager maps it to
/// [`crate::cache::CacheStatus::Corrupted`] and callers rescan.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cannot read cache entry {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache entry {path} is not valid JSON: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache entry {path} has an invalid timestamp '{value}'")]
    InvalidTimestamp { path: PathBuf, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::band_not_found("Pink Floyd");
        assert!(err.to_string().contains("Pink Floyd"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::config("bad threshold").context("while loading config");
        let msg = err.to_string();
        assert!(msg.contains("while loading config"));
        assert!(msg.contains("bad threshold"));
    }

    #[test]
    fn test_lock_timeout_display() {
        let err = StorageError::LockTimeout {
            path: PathBuf::from("/music/X/.band_metadata.json"),
            timeout: Duration::from_millis(100),
        };
        assert!(err.is_lock_timeout());
        assert!(err.to_string().contains(".band_metadata.json"));
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::RatingOutOfRange {
            field: "analyze.rate".to_string(),
            value: 11,
        };
        assert_eq!(err.field(), "analyze.rate");
        assert!(err.to_string().contains("1-10"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::config("test"));
        let with_ctx = result.with_context("additional context");
        assert!(with_ctx.unwrap_err().to_string().contains("additional context"));
    }
}
