//! Backup manager for clipkeep
//!
//! Handles automatic backups into the local backup directory, their rolling
//! retention, and lookup of existing backup files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::paths::ClipPaths;
use crate::config::settings::BackupSettings;
use crate::error::{ClipError, ClipResult};

use super::document::{BackupDocument, BACKUP_EXTENSION};
use super::io::FileSink;
use super::reader::parse_document;
use super::retention::{list_backup_files, rotate};
use super::writer::{BackupWriter, ExportOptions, ExportSummary};

/// Metadata about a backup file
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    /// Backup filename
    pub file_name: String,
    /// Full path to backup
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// When the backup was created, as recorded in the document
    pub created_at: DateTime<Utc>,
    pub version: u32,
    pub item_count: usize,
    pub tag_count: usize,
    pub secure_items: usize,
    /// Whether any item is encrypted
    pub is_encrypted: bool,
    pub app_version: String,
    pub device_info: String,
}

impl BackupInfo {
    fn from_document(path: &Path, size_bytes: u64, document: &BackupDocument) -> Self {
        Self {
            file_name: file_name(path),
            path: path.to_path_buf(),
            size_bytes,
            created_at: document.created_at,
            version: document.version,
            item_count: document.items.len(),
            tag_count: document.tags.len(),
            secure_items: document.metadata.secure_items,
            is_encrypted: document.has_encrypted_items(),
            app_version: document.app_version.clone(),
            device_info: document.device_info.clone(),
        }
    }
}

/// Result of an automatic backup
#[derive(Debug, Clone)]
pub struct AutoBackup {
    pub path: PathBuf,
    pub export: ExportSummary,
    /// Older backups removed by retention
    pub deleted: Vec<PathBuf>,
}

/// Manages the local backup directory
pub struct BackupManager {
    backup_dir: PathBuf,
    settings: BackupSettings,
    preferences: BTreeMap<String, String>,
}

impl BackupManager {
    /// Create a new BackupManager
    pub fn new(paths: &ClipPaths, settings: BackupSettings) -> Self {
        Self {
            backup_dir: paths.backup_dir(),
            settings,
            preferences: BTreeMap::new(),
        }
    }

    /// Preferences written into automatic backups
    pub fn with_preferences(mut self, preferences: BTreeMap<String, String>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Get the backup policy
    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    /// Export policy used for automatic backups
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            include_secure: self.settings.include_secure,
            encrypt_secure: self.settings.encrypt_secure,
            preferences: self.preferences.clone(),
        }
    }

    /// Export through `writer` into a new timestamped file, then rotate
    ///
    /// Retention only runs after a successful export.
    pub fn create_auto_backup(&self, writer: &BackupWriter<'_>) -> ClipResult<AutoBackup> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            ClipError::Io(format!("Failed to create backup directory: {}", e))
        })?;

        let path = unique_backup_path(&self.backup_dir, Utc::now());
        let mut sink = FileSink::new(&path);
        let export = writer.export(&mut sink, &self.export_options())?;

        let deleted = self.prune()?;
        info!(
            path = %path.display(),
            deleted = deleted.len(),
            "Automatic backup created"
        );

        Ok(AutoBackup {
            path,
            export,
            deleted,
        })
    }

    /// Apply the configured retention to the backup directory
    pub fn prune(&self) -> ClipResult<Vec<PathBuf>> {
        self.prune_to(self.settings.keep_count)
    }

    /// Keep only the `keep` most recent backups
    pub fn prune_to(&self, keep: usize) -> ClipResult<Vec<PathBuf>> {
        rotate(&self.backup_dir, keep)
    }

    /// List all readable backups, newest first
    ///
    /// Files that cannot be read or parsed are skipped with a warning.
    pub fn list_local_backups(&self) -> ClipResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let files = list_backup_files(&self.backup_dir).map_err(|e| {
            ClipError::Io(format!("Failed to read backup directory: {}", e))
        })?;

        let mut backups: Vec<BackupInfo> = files
            .into_iter()
            .filter_map(|(path, _)| match read_info(&path) {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable backup");
                    None
                }
            })
            .collect();

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });

        Ok(backups)
    }

    /// Get the most recent backup
    pub fn latest_backup(&self) -> ClipResult<Option<BackupInfo>> {
        Ok(self.list_local_backups()?.into_iter().next())
    }

    /// Resolve a backup identifier to a full path
    ///
    /// Accepts `latest`, a path, a file name in the backup directory, or a
    /// file name without its extension.
    pub fn resolve(&self, backup: &str) -> ClipResult<PathBuf> {
        if backup.eq_ignore_ascii_case("latest") {
            return self
                .latest_backup()?
                .map(|b| b.path)
                .ok_or_else(|| ClipError::backup_not_found("latest"));
        }

        let path = PathBuf::from(backup);
        if path.is_file() {
            return Ok(path);
        }

        let in_dir = self.backup_dir.join(backup);
        if in_dir.is_file() {
            return Ok(in_dir);
        }

        let with_ext = self
            .backup_dir
            .join(format!("{}.{}", backup, BACKUP_EXTENSION));
        if with_ext.is_file() {
            return Ok(with_ext);
        }

        Err(ClipError::backup_not_found(backup))
    }

    /// Read the info of a single backup file
    pub fn info(&self, backup: &str) -> ClipResult<BackupInfo> {
        read_info(&self.resolve(backup)?)
    }
}

/// `clipkeep-YYYYMMDD-HHMMSS-mmm.clipbak`
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!(
        "clipkeep-{}-{:03}.{}",
        at.format("%Y%m%d-%H%M%S"),
        at.timestamp_subsec_millis(),
        BACKUP_EXTENSION
    )
}

/// First free path for a backup taken at `at`
///
/// Backups within the same millisecond get a `-1`, `-2`, ... suffix.
fn unique_backup_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    let name = backup_file_name(at);
    let mut path = dir.join(&name);
    let stem = name.trim_end_matches(&format!(".{}", BACKUP_EXTENSION)).to_string();

    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}.{}", stem, n, BACKUP_EXTENSION));
        n += 1;
    }
    path
}

fn read_info(path: &Path) -> ClipResult<BackupInfo> {
    let bytes = fs::read(path)
        .map_err(|e| ClipError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    let document = parse_document(&bytes)?;
    Ok(BackupInfo::from_document(path, bytes.len() as u64, &document))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClipItem;
    use crate::storage::{ClipboardStore, Storage};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_manager(keep_count: usize) -> (BackupManager, Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = ClipPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths.clone()).unwrap();
        storage.insert_item(ClipItem::new("remember me")).unwrap();

        let settings = BackupSettings {
            keep_count,
            ..BackupSettings::default()
        };
        let manager = BackupManager::new(&paths, settings);
        (manager, storage, temp_dir)
    }

    #[test]
    fn test_backup_file_name() {
        let at = Utc.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap()
            + chrono::Duration::milliseconds(7);
        assert_eq!(backup_file_name(at), "clipkeep-20251127-143022-007.clipbak");
    }

    #[test]
    fn test_same_millisecond_gets_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap();

        let first = unique_backup_path(temp_dir.path(), at);
        assert_eq!(file_name(&first), "clipkeep-20251127-143022-000.clipbak");
        fs::write(&first, "{}").unwrap();

        let second = unique_backup_path(temp_dir.path(), at);
        assert_eq!(file_name(&second), "clipkeep-20251127-143022-000-1.clipbak");
        fs::write(&second, "{}").unwrap();

        let third = unique_backup_path(temp_dir.path(), at);
        assert_eq!(file_name(&third), "clipkeep-20251127-143022-000-2.clipbak");
    }

    #[test]
    fn test_back_to_back_backups_are_all_kept() {
        let (manager, storage, _temp) = create_test_manager(5);
        let writer = BackupWriter::new(&storage);

        let a = manager.create_auto_backup(&writer).unwrap();
        let b = manager.create_auto_backup(&writer).unwrap();

        assert_ne!(a.path, b.path);
        assert!(a.path.exists() && b.path.exists());
        assert_eq!(manager.list_local_backups().unwrap().len(), 2);
    }

    #[test]
    fn test_auto_backup_records_preferences() {
        let (manager, storage, _temp) = create_test_manager(5);
        let mut preferences = BTreeMap::new();
        preferences.insert("language".to_string(), "de".to_string());
        let manager = manager.with_preferences(preferences.clone());

        let backup = manager
            .create_auto_backup(&BackupWriter::new(&storage))
            .unwrap();
        let document = parse_document(&fs::read(&backup.path).unwrap()).unwrap();
        assert_eq!(document.preferences, preferences);
    }

    #[test]
    fn test_create_auto_backup() {
        let (manager, storage, _temp) = create_test_manager(5);
        let writer = BackupWriter::new(&storage);

        let backup = manager.create_auto_backup(&writer).unwrap();
        assert!(backup.path.exists());
        assert!(backup.path.starts_with(manager.backup_dir()));
        assert_eq!(backup.export.item_count, 1);
        assert!(backup.deleted.is_empty());

        let backups = manager.list_local_backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].item_count, 1);
        assert_eq!(backups[0].size_bytes, backup.export.size_bytes);
    }

    #[test]
    fn test_sixth_backup_rotates_oldest_away() {
        let (manager, storage, _temp) = create_test_manager(5);
        let writer = BackupWriter::new(&storage);

        let mut created = Vec::new();
        for _ in 0..6 {
            created.push(manager.create_auto_backup(&writer).unwrap());
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        assert_eq!(created[5].deleted, vec![created[0].path.clone()]);
        assert_eq!(manager.list_local_backups().unwrap().len(), 5);
        assert!(!created[0].path.exists());
    }

    #[test]
    fn test_list_skips_unparseable_files() {
        let (manager, storage, _temp) = create_test_manager(5);
        let writer = BackupWriter::new(&storage);
        manager.create_auto_backup(&writer).unwrap();
        fs::write(manager.backup_dir().join("broken.clipbak"), "not json").unwrap();

        let backups = manager.list_local_backups().unwrap();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_resolve() {
        let (manager, storage, _temp) = create_test_manager(5);
        assert!(manager.resolve("latest").unwrap_err().is_not_found());

        let writer = BackupWriter::new(&storage);
        let backup = manager.create_auto_backup(&writer).unwrap();
        let name = file_name(&backup.path);
        let stem = name.trim_end_matches(".clipbak").to_string();

        assert_eq!(manager.resolve("latest").unwrap(), backup.path);
        assert_eq!(manager.resolve(&name).unwrap(), backup.path);
        assert_eq!(manager.resolve(&stem).unwrap(), backup.path);
        assert_eq!(
            manager.resolve(&backup.path.display().to_string()).unwrap(),
            backup.path
        );
        assert!(manager.resolve("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_backup_dir() {
        let (manager, _storage, _temp) = create_test_manager(5);
        assert!(manager.list_local_backups().unwrap().is_empty());
        assert!(manager.latest_backup().unwrap().is_none());
    }
}
