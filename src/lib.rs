//! Music Catalog - classification and folder-name compliance for a music
//! library laid out as `{root}/{Band}/[{Type}/]{YYYY - Title (Edition)}`.
//!
//! The pipeline for one band is:
//!
//! 1. [`scanner`] finds album folders and counts tracks
//! 2. [`parser`] splits folder names into year, title and edition
//! 3. [`classify`] assigns an album type
//! 4. [`structure`] detects the band's layout and its consistency
//! 5. [`compliance`] scores every album and the band
//!
//! [`library::Catalog`] ties the stages together and persists results through
//! [`storage`], with [`cache`] deciding when stored metadata can be reused.

pub mod cache;
pub mod classify;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod error;
pub mod library;
pub mod model;
pub mod parser;
pub mod scanner;
pub mod storage;
pub mod structure;
#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};
pub use library::Catalog;
