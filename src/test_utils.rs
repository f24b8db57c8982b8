//! Test utilities and fixtures for music-catalog tests.
//!
//! [`LibraryFixture`] builds a throwaway music root with band and album
//! folders filled with empty audio files.
//!
//! # Example
//!
//! ```ignore
//! use music_catalog::test_utils::LibraryFixture;
//!
//! #[test]
//! fn test_something() {
//!     let fixture = LibraryFixture::new();
//!     fixture.album("Pink Floyd", "1971 - Meddle", 6);
//!     fixture.album("Pink Floyd", "Live/1972 - Live at Pompeii", 8);
//!     // ... test logic against fixture.root()
//! }
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::Config;

/// A temporary music root.
///
/// The directory is deleted when the fixture is dropped.
pub struct LibraryFixture {
    dir: TempDir,
}

impl LibraryFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn band_dir(&self, band: &str) -> PathBuf {
        self.root().join(band)
    }

    /// Create `{root}/{band}/{relative}` holding `tracks` empty mp3 files.
    ///
    /// `relative` may include a type folder (`Live/1985 - Title`).
    pub fn album(&self, band: &str, relative: &str, tracks: u32) -> PathBuf {
        let path = self.band_dir(band).join(relative);
        std::fs::create_dir_all(&path).expect("Failed to create album directory");
        for n in 1..=tracks {
            std::fs::File::create(path.join(format!("{n:02} - Track {n}.mp3")))
                .expect("Failed to create track file");
        }
        path
    }

    /// Create a hidden directory under a band (or the root when `band` is empty).
    pub fn hidden_dir(&self, band: &str, name: &str) -> PathBuf {
        let path = self.band_dir(band).join(name);
        std::fs::create_dir_all(&path).expect("Failed to create hidden directory");
        path
    }

    /// Write raw text to `{root}/{band}/{file}`.
    pub fn write_file(&self, band: &str, file: &str, contents: &str) -> PathBuf {
        let path = self.band_dir(band).join(file);
        std::fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("Failed to create band directory");
        std::fs::write(&path, contents).expect("Failed to write file");
        path
    }

    /// Default configuration pointed at this root.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.library.music_root = Some(self.root().to_path_buf());
        config.storage.lock_timeout_ms = 2000;
        config
    }
}

impl Default for LibraryFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_creates_tracks() {
        let fixture = LibraryFixture::new();
        let path = fixture.album("Band", "Live/1985 - C", 3);
        assert!(path.starts_with(fixture.root()));
        assert_eq!(std::fs::read_dir(&path).unwrap().count(), 3);
    }

    #[test]
    fn test_config_points_at_root() {
        let fixture = LibraryFixture::new();
        let config = fixture.config();
        assert_eq!(config.library.music_root.as_deref(), Some(fixture.root()));
    }
}
