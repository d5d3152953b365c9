//! Configuration module for clipkeep
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence
//! - Backup policy defaults

pub mod paths;
pub mod settings;

pub use paths::ClipPaths;
pub use settings::{BackupSettings, Settings};
