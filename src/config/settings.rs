//! User settings for clipkeep
//!
//! Manages backup policy defaults, retention, logging and encryption settings.

use serde::{Deserialize, Serialize};

use super::paths::ClipPaths;
use crate::backup::retention::DEFAULT_KEEP_COUNT;
use crate::crypto::key_derivation::KeyDerivationParams;
use crate::error::ClipError;

/// Automatic backup policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Number of automatic backups to keep
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,
    /// Whether automatic backups include secure items
    #[serde(default = "default_true")]
    pub include_secure: bool,
    /// Whether secure items are encrypted inside automatic backups
    #[serde(default = "default_true")]
    pub encrypt_secure: bool,
}

fn default_keep_count() -> usize {
    DEFAULT_KEEP_COUNT
}

fn default_true() -> bool {
    true
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            keep_count: default_keep_count(),
            include_secure: true,
            encrypt_secure: true,
        }
    }
}

/// Encryption settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncryptionSettings {
    /// Key derivation parameters (salt, memory cost, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_params: Option<KeyDerivationParams>,
}

/// User settings for clipkeep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Default tracing filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// UI language recorded in backup metadata
    #[serde(default = "default_language")]
    pub language: String,

    /// Device model recorded in backup metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,

    /// Automatic backup policy
    #[serde(default)]
    pub backup: BackupSettings,

    /// Encryption settings
    #[serde(default)]
    pub encryption: EncryptionSettings,
}

fn default_schema_version() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: default_log_level(),
            language: default_language(),
            device_model: None,
            backup: BackupSettings::default(),
            encryption: EncryptionSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &ClipPaths) -> Result<Self, ClipError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| ClipError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                ClipError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &ClipPaths) -> Result<(), ClipError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ClipError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| ClipError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.backup.keep_count, 5);
        assert!(settings.backup.include_secure);
        assert!(settings.backup.encrypt_secure);
        assert_eq!(settings.log_level, "info");
        assert!(settings.encryption.key_params.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ClipPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.backup.keep_count = 3;
        settings.language = "de".into();

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.backup.keep_count, 3);
        assert_eq!(loaded.language, "de");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let loaded: Settings = serde_json::from_str(r#"{"backup": {"keep_count": 9}}"#).unwrap();
        assert_eq!(loaded.backup.keep_count, 9);
        assert!(loaded.backup.encrypt_secure);
        assert_eq!(loaded.schema_version, 1);
    }
}
