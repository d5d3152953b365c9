//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup engine.

pub mod backup;
pub mod transfer;

pub use backup::{handle_backup_command, BackupCommands};
pub use transfer::{handle_export_command, handle_import_command, ExportArgs, ImportArgs};

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::backup::{AppInfo, ProgressSink, ProgressStage, ProgressState};
use crate::config::{ClipPaths, Settings};
use crate::crypto::{AesGcmProvider, KeyDerivationParams, SecureString};
use crate::error::{ClipError, ClipResult};

/// Environment variable consulted before prompting for a passphrase
pub const PASSPHRASE_ENV: &str = "CLIPKEEP_PASSPHRASE";

/// Read the passphrase from the environment or prompt for it (hidden input)
pub fn read_passphrase(prompt: &str) -> ClipResult<SecureString> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
        if !value.is_empty() {
            return Ok(SecureString::from(value));
        }
    }

    rpassword::prompt_password(prompt)
        .map(SecureString::from)
        .map_err(|e| ClipError::Encryption(format!("Failed to read passphrase: {}", e)))
}

/// Provider for writing encrypted items, creating key parameters on first use
pub fn provider_for_export(paths: &ClipPaths, settings: &mut Settings) -> ClipResult<AesGcmProvider> {
    if settings.encryption.key_params.is_none() {
        settings.encryption.key_params = Some(KeyDerivationParams::new());
        settings.save(paths)?;
        info!("Generated new key derivation parameters");
    }

    let passphrase = read_passphrase("Backup passphrase: ")?;
    AesGcmProvider::from_settings(passphrase.as_str(), settings)
}

/// Provider for reading encrypted items
///
/// Tokens name their own key parameters; the configured ones are only needed
/// for older tokens. Without a passphrase the import runs without a provider
/// and every encrypted item is counted as failed.
pub fn provider_for_import(settings: &Settings) -> Option<AesGcmProvider> {
    let passphrase = match read_passphrase("Backup passphrase: ") {
        Ok(passphrase) => passphrase,
        Err(e) => {
            warn!("No passphrase available, encrypted items will not be restored: {}", e);
            return None;
        }
    };

    match &settings.encryption.key_params {
        Some(params) => match AesGcmProvider::from_passphrase(passphrase.as_str(), params) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!("Configured key parameters are unusable: {}", e);
                Some(AesGcmProvider::for_reading(passphrase.as_str()))
            }
        },
        None => Some(AesGcmProvider::for_reading(passphrase.as_str())),
    }
}

/// Provenance recorded in backups written by the CLI
pub fn app_info(settings: &Settings) -> AppInfo {
    let app = AppInfo::current().with_language(settings.language.clone());
    match &settings.device_model {
        Some(model) => app.with_device_model(model.clone()),
        None => app,
    }
}

/// Preferences written into every backup the CLI creates
pub fn export_preferences(settings: &Settings) -> BTreeMap<String, String> {
    let mut preferences = BTreeMap::new();
    preferences.insert("language".to_string(), settings.language.clone());
    preferences.insert(
        "backup.keep_count".to_string(),
        settings.backup.keep_count.to_string(),
    );
    preferences
}

/// Prints one line per stage to stderr
#[derive(Default)]
pub struct ConsoleProgress {
    last_stage: Mutex<Option<ProgressStage>>,
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, state: &ProgressState) {
        let mut last = self
            .last_stage
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.is_completed || *last != Some(state.stage) {
            *last = Some(state.stage);
            if !state.is_completed {
                eprintln!("[{:>3}%] {}", state.percent, state.message);
            }
        }
    }
}

/// Format a duration in human-readable form
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_duration(chrono::Duration::hours(3)), "3h");
        assert_eq!(format_duration(chrono::Duration::days(2)), "2d");
        assert_eq!(format_duration(chrono::Duration::days(65)), "2mo");
    }

    #[test]
    fn test_app_info_uses_settings() {
        let settings = Settings {
            device_model: Some("Pixel".into()),
            language: "fr".into(),
            ..Settings::default()
        };
        let app = app_info(&settings);
        assert_eq!(app.device_model, "Pixel");
        assert_eq!(app.language, "fr");
    }

    #[test]
    fn test_export_preferences() {
        let settings = Settings {
            language: "de".into(),
            ..Settings::default()
        };
        let preferences = export_preferences(&settings);
        assert_eq!(preferences["language"], "de");
        assert_eq!(
            preferences["backup.keep_count"],
            settings.backup.keep_count.to_string()
        );
    }
}
