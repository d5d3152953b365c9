//! Backup CLI commands
//!
//! Implements CLI commands for the local automatic backups.

use std::sync::Arc;

use chrono::Utc;
use clap::Subcommand;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::{
    BackupInfo, BackupManager, BackupReader, BackupWriter, FileSource, ProgressReporter,
};
use crate::config::{ClipPaths, Settings};
use crate::crypto::AesGcmProvider;
use crate::error::ClipResult;
use crate::storage::Storage;

use super::{
    app_info, export_preferences, format_duration, format_size, provider_for_export,
    ConsoleProgress,
};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup in the backup directory
    Create,

    /// List all available backups
    List,

    /// Show information about a specific backup
    Info {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Delete old backups according to the retention policy
    Prune {
        /// Number of backups to keep (defaults to the configured count)
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Items")]
    items: usize,
    #[tabled(rename = "Tags")]
    tags: usize,
    #[tabled(rename = "Encrypted")]
    encrypted: &'static str,
    #[tabled(rename = "Size")]
    size: String,
}

impl BackupRow {
    fn new(index: usize, info: &BackupInfo) -> Self {
        Self {
            index,
            file: info.file_name.clone(),
            age: format_duration(Utc::now().signed_duration_since(info.created_at)),
            items: info.item_count,
            tags: info.tag_count,
            encrypted: if info.is_encrypted { "yes" } else { "no" },
            size: format_size(info.size_bytes),
        }
    }
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &ClipPaths,
    settings: &mut Settings,
    storage: &Storage,
    cmd: BackupCommands,
) -> ClipResult<()> {
    let manager = BackupManager::new(paths, settings.backup.clone())
        .with_preferences(export_preferences(settings));

    match cmd {
        BackupCommands::Create => {
            let policy = manager.export_options();
            let has_secure = storage.items.get_all()?.iter().any(|i| i.is_secure);
            let provider: Option<AesGcmProvider> =
                if has_secure && policy.include_secure && policy.encrypt_secure {
                    Some(provider_for_export(paths, settings)?)
                } else {
                    None
                };

            let progress = ProgressReporter::new();
            progress.add_sink(Arc::new(ConsoleProgress::default()));
            let mut writer = BackupWriter::new(storage)
                .with_progress(progress)
                .with_app_info(app_info(settings));
            if let Some(provider) = provider.as_ref() {
                writer = writer.with_encryption(provider);
            }

            let backup = manager.create_auto_backup(&writer)?;
            println!("Backup created: {}", backup.export.file_name);
            println!("Location: {}", backup.path.display());
            println!("{}", backup.export.summary());
            if !backup.deleted.is_empty() {
                println!("Removed {} old backup(s).", backup.deleted.len());
            }
        }

        BackupCommands::List => {
            let backups = manager.list_local_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: clipkeep backup create");
                return Ok(());
            }

            let rows: Vec<BackupRow> = backups
                .iter()
                .enumerate()
                .map(|(i, info)| BackupRow::new(i + 1, info))
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Info { backup } => {
            let path = manager.resolve(&backup)?;
            let info = manager.info(&path.display().to_string())?;
            let status = match BackupReader::inspect(&mut FileSource::new(&path)) {
                Ok(_) => "OK".to_string(),
                Err(e) => format!("INVALID ({})", e),
            };

            println!("Backup Details");
            println!("==============");
            println!("File: {}", info.path.display());
            println!("Size: {}", format_size(info.size_bytes));
            println!("Created: {}", info.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("Format version: {}", info.version);
            println!("App version: {}", info.app_version);
            println!("Device: {}", info.device_info);
            println!();
            println!("Contents:");
            println!("  Items:        {}", info.item_count);
            println!("  Secure items: {}", info.secure_items);
            println!("  Tags:         {}", info.tag_count);
            println!(
                "  Encrypted:    {}",
                if info.is_encrypted { "Yes" } else { "No" }
            );
            println!();
            println!("Integrity: {}", status);
        }

        BackupCommands::Prune { keep } => {
            let keep = keep.unwrap_or(settings.backup.keep_count);
            let deleted = manager.prune_to(keep)?;

            if deleted.is_empty() {
                println!("No backups to prune (keeping {}).", keep);
            } else {
                println!("Deleted {} backup(s), keeping {}.", deleted.len(), keep);
            }
        }
    }

    Ok(())
}
