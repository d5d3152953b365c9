//! Export and import CLI commands

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::backup::{
    parse_document, BackupManager, BackupReader, BackupWriter, ExportOptions, FileSink,
    FileSource, ImportOptions, ProgressReporter,
};
use crate::config::{ClipPaths, Settings};
use crate::crypto::AesGcmProvider;
use crate::error::{ClipError, ClipResult};
use crate::storage::Storage;

use super::{
    app_info, export_preferences, provider_for_export, provider_for_import, ConsoleProgress,
};

/// Arguments of `clipkeep export`
#[derive(Args)]
pub struct ExportArgs {
    /// Destination file
    pub file: PathBuf,

    /// Leave secure items out of the backup
    #[arg(long)]
    pub no_secure: bool,

    /// Store secure items without encrypting them
    #[arg(long, conflicts_with = "no_secure")]
    pub plain_secure: bool,
}

/// Arguments of `clipkeep import`
#[derive(Args)]
pub struct ImportArgs {
    /// Backup file path, backup name, or 'latest'
    pub file: String,

    /// Delete unpinned items before restoring
    #[arg(long)]
    pub overwrite: bool,

    /// Do not restore secure items
    #[arg(long)]
    pub skip_secure: bool,

    /// Skip items whose content and timestamp already exist
    #[arg(long)]
    pub dedupe: bool,
}

fn console_progress() -> ProgressReporter {
    let progress = ProgressReporter::new();
    progress.add_sink(Arc::new(ConsoleProgress::default()));
    progress
}

/// Handle `clipkeep export`
pub fn handle_export_command(
    paths: &ClipPaths,
    settings: &mut Settings,
    storage: &Storage,
    args: ExportArgs,
) -> ClipResult<()> {
    let options = ExportOptions {
        include_secure: !args.no_secure,
        encrypt_secure: !args.plain_secure,
        preferences: export_preferences(settings),
    };

    let has_secure = storage.items.get_all()?.iter().any(|i| i.is_secure);
    let provider: Option<AesGcmProvider> =
        if has_secure && options.include_secure && options.encrypt_secure {
            Some(provider_for_export(paths, settings)?)
        } else {
            None
        };

    let mut writer = BackupWriter::new(storage)
        .with_progress(console_progress())
        .with_app_info(app_info(settings));
    if let Some(provider) = provider.as_ref() {
        writer = writer.with_encryption(provider);
    }

    let summary = writer.export(&mut FileSink::new(&args.file), &options)?;

    println!("{}", summary.summary());
    println!("Location: {}", args.file.display());
    if summary.skipped_items > 0 {
        println!(
            "Warning: {} secure item(s) could not be encrypted and were left out.",
            summary.skipped_items
        );
    }

    Ok(())
}

/// Handle `clipkeep import`
pub fn handle_import_command(
    paths: &ClipPaths,
    settings: &Settings,
    storage: &Storage,
    args: ImportArgs,
) -> ClipResult<()> {
    let manager = BackupManager::new(paths, settings.backup.clone());
    let path = manager.resolve(&args.file)?;

    let options = ImportOptions {
        overwrite_existing: args.overwrite,
        restore_secure: !args.skip_secure,
        dedupe: args.dedupe,
    };

    // Only ask for a passphrase when the backup actually needs one; parse
    // errors are reported by the import itself
    let bytes = fs::read(&path)
        .map_err(|e| ClipError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    let needs_key = options.restore_secure
        && parse_document(&bytes)
            .map(|d| d.has_encrypted_items())
            .unwrap_or(false);
    let provider = if needs_key {
        provider_for_import(settings)
    } else {
        None
    };

    let mut reader = BackupReader::new(storage).with_progress(console_progress());
    if let Some(provider) = provider.as_ref() {
        reader = reader.with_encryption(provider);
    }

    let summary = match reader.import(&mut FileSource::new(&path), &options) {
        Ok(summary) => summary,
        Err(e) => {
            if e.is_validation() {
                eprintln!("The backup was rejected; the clipboard history was not modified.");
            }
            return Err(e);
        }
    };
    storage.save_all()?;

    println!("{}", summary.summary());
    if summary.deleted_items > 0 {
        println!("Removed {} unpinned item(s) before restoring.", summary.deleted_items);
    }
    if !summary.preferences.is_empty() {
        println!(
            "Backup carries {} preference(s); they were not applied.",
            summary.preferences.len()
        );
    }

    Ok(())
}
