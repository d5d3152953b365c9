//! Path management for clipkeep
//!
//! Provides XDG-compliant path resolution for configuration, store data, and backups.
//!
//! ## Path Resolution Order
//!
//! 1. `CLIPKEEP_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/clipkeep` or `~/.config/clipkeep`
//! 3. Windows: `%APPDATA%\clipkeep`

use std::path::PathBuf;

use crate::error::ClipError;

/// Manages all paths used by clipkeep
#[derive(Debug, Clone)]
pub struct ClipPaths {
    /// Base directory for all clipkeep data
    base_dir: PathBuf,
}

impl ClipPaths {
    /// Create a new ClipPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, ClipError> {
        let base_dir = if let Ok(custom) = std::env::var("CLIPKEEP_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create ClipPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/clipkeep/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding the clipboard store files
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the directory holding automatic backups
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to items.json
    pub fn items_file(&self) -> PathBuf {
        self.data_dir().join("items.json")
    }

    /// Get the path to tags.json
    pub fn tags_file(&self) -> PathBuf {
        self.data_dir().join("tags.json")
    }

    /// Ensure the base, data and backup directories exist
    pub fn ensure_directories(&self) -> Result<(), ClipError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| ClipError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| ClipError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| ClipError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, ClipError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("clipkeep"));
    }

    let base = directories::BaseDirs::new()
        .ok_or_else(|| ClipError::Config("Could not determine home directory".into()))?;
    Ok(base.home_dir().join(".config").join("clipkeep"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, ClipError> {
    let base = directories::BaseDirs::new()
        .ok_or_else(|| ClipError::Config("Could not determine APPDATA directory".into()))?;
    Ok(base.config_dir().join("clipkeep"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ClipPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ClipPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.backup_dir().exists());
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ClipPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.items_file(),
            temp_dir.path().join("data").join("items.json")
        );
        assert_eq!(
            paths.tags_file(),
            temp_dir.path().join("data").join("tags.json")
        );
    }
}
