use anyhow::Result;
use clap::{Parser, Subcommand};

use clipkeep::cli::{
    handle_backup_command, handle_export_command, handle_import_command, BackupCommands,
    ExportArgs, ImportArgs,
};
use clipkeep::config::{ClipPaths, Settings};
use clipkeep::logging;
use clipkeep::storage::Storage;

#[derive(Parser)]
#[command(
    name = "clipkeep",
    version,
    about = "Backup and restore for clipboard history",
    long_about = "clipkeep exports your clipboard history and tags into a single \
                  self-describing backup file, encrypting secure entries, and \
                  restores such backups with integrity checking."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the clipboard history to a backup file
    Export(ExportArgs),

    /// Import a backup file into the clipboard history
    Import(ImportArgs),

    /// Automatic backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = ClipPaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;
    logging::init(&settings.log_level)?;

    // Initialize storage
    let storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    match cli.command {
        Some(Commands::Export(args)) => {
            handle_export_command(&paths, &mut settings, &storage, args)?;
        }
        Some(Commands::Import(args)) => {
            handle_import_command(&paths, &settings, &storage, args)?;
        }
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&paths, &mut settings, &storage, cmd)?;
        }
        Some(Commands::Config) => {
            println!("clipkeep Configuration");
            println!("======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!();
            println!("Settings:");
            println!("  Log level:          {}", settings.log_level);
            println!("  Backups kept:       {}", settings.backup.keep_count);
            println!("  Include secure:     {}", settings.backup.include_secure);
            println!("  Encrypt secure:     {}", settings.backup.encrypt_secure);
            println!(
                "  Key parameters:     {}",
                if settings.encryption.key_params.is_some() {
                    "configured"
                } else {
                    "not configured"
                }
            );
            println!();
            println!("Items in history: {}", storage.items.count()?);
            println!("Tags:             {}", storage.tags.count()?);
        }
        None => {
            println!("clipkeep - Backup and restore for clipboard history");
            println!();
            println!("Run 'clipkeep --help' for usage information.");
        }
    }

    Ok(())
}
