//! Directory walking for the music root.
//!
//! Expected layout:
//!
//! ```text
//! {root}/{Band}/{YYYY - Title (Edition)}/...            (default)
//! {root}/{Band}/{Type}/{YYYY - Title (Edition)}/...     (enhanced)
//! ```
//!
//! Hidden entries (names starting with `.`) are ignored everywhere. Bands and
//! albums come back sorted by name.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::model::AlbumType;

/// Per-disc folders inside a multi-disc album (`CD1`, `Disc 2`, `disk3`).
static DISC_FOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(cd|dis[ck])\s*\d+$").unwrap());

/// Audio extensions counted as tracks (case-insensitive).
pub const AUDIO_EXTENSIONS: [&str; 10] = [
    "mp3", "flac", "ogg", "wav", "m4a", "opus", "aac", "wma", "aiff", "ape",
];

/// One album directory found under a band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumFolder {
    pub path: PathBuf,
    pub folder_name: String,
    /// Name of the type folder the album is nested under, as written on disk.
    pub type_folder: Option<String>,
    pub track_count: u32,
}

/// A band directory and its album folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandFolder {
    pub name: String,
    pub path: PathBuf,
    pub albums: Vec<AlbumFolder>,
}

/// Check if a path has an audio file extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_lowercase();
            AUDIO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Visible sub-directories of `dir`, sorted by name.
fn subdirectories(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(target: "scan", "Skipping non-UTF-8 directory in {}", dir.display());
            continue;
        };
        if !is_hidden(&name) {
            dirs.push((name, entry.path()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Band directories under the music root.
pub fn list_bands(root: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    subdirectories(root)
}

/// Audio files anywhere under `dir` (covers CD1/CD2 sub-folders).
pub fn count_tracks(dir: &Path) -> u32 {
    let count = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_str().is_some_and(is_hidden))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn has_audio_files(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_ok_and(|t| t.is_file()) && is_audio_file(&e.path()))
    })
}

/// A directory named after an album type that holds album directories.
///
/// An album that happens to be called `Live` or `Demo` is not one: it has
/// tracks of its own, or only disc folders below it.
fn is_type_folder(name: &str, path: &Path) -> bool {
    if AlbumType::from_folder_name(name).is_none() || has_audio_files(path) {
        return false;
    }
    subdirectories(path).is_ok_and(|dirs| {
        dirs.iter().any(|(child, _)| !DISC_FOLDER.is_match(child))
    })
}

/// Collect the album folders of one band.
pub fn scan_band(name: &str, path: &Path) -> std::io::Result<BandFolder> {
    let mut albums = Vec::new();

    for (child_name, child_path) in subdirectories(path)? {
        if is_type_folder(&child_name, &child_path) {
            for (album_name, album_path) in subdirectories(&child_path)? {
                albums.push(AlbumFolder {
                    track_count: count_tracks(&album_path),
                    path: album_path,
                    folder_name: album_name,
                    type_folder: Some(child_name.clone()),
                });
            }
        } else {
            albums.push(AlbumFolder {
                track_count: count_tracks(&child_path),
                path: child_path,
                folder_name: child_name,
                type_folder: None,
            });
        }
    }

    tracing::debug!(target: "scan", "{}: {} album folders", name, albums.len());
    Ok(BandFolder {
        name: name.to_string(),
        path: path.to_path_buf(),
        albums,
    })
}
