//! Command-line interface for music-catalog.
//!
//! This module provides CLI commands for scanning the music root, inspecting
//! and editing band metadata, checking folder-name compliance, and cache and
//! backup maintenance.

mod commands;

pub use commands::{Cli, Commands, run_command};
