//! Backup engine for clipkeep
//!
//! Exports the clipboard history into a single self-describing JSON document
//! and restores such documents into a store.
//!
//! # Architecture
//!
//! - [`BackupWriter`]: store → document → [`ByteSink`]
//! - [`BackupReader`]: [`ByteSource`] → validated document → store
//! - [`BackupManager`]: timestamped automatic backups in the local backup
//!   directory, with rolling retention
//! - [`ProgressReporter`]: latest-value progress cell shared with observers
//!
//! # Integrity
//!
//! Every document carries a SHA-256 checksum over its items and tags. A
//! document that fails any validation step is rejected before the store is
//! touched. Secure items are encrypted per item; if that is not possible they
//! are left out of the backup, never written in plaintext.
//!
//! # Example
//!
//! ```rust,ignore
//! use clipkeep::backup::{BackupReader, BackupWriter, ExportOptions, FileSink, FileSource, ImportOptions};
//!
//! let writer = BackupWriter::new(&storage).with_encryption(&provider);
//! let summary = writer.export(&mut FileSink::new("history.clipbak"), &ExportOptions::default())?;
//! println!("{}", summary.summary());
//!
//! let reader = BackupReader::new(&storage).with_encryption(&provider);
//! let result = reader.import(&mut FileSource::new("history.clipbak"), &ImportOptions::default())?;
//! println!("{}", result.summary());
//! ```

pub mod cancel;
pub mod checksum;
pub mod document;
pub mod io;
mod manager;
pub mod progress;
mod reader;
pub mod retention;
mod writer;

pub use cancel::CancellationToken;
pub use document::{
    BackupDocument, BackupItemRecord, BackupMetadata, BackupTagRecord, BACKUP_EXTENSION,
    BACKUP_FORMAT_VERSION, MAX_SUPPORTED_VERSION,
};
pub use io::{ByteSink, ByteSource, FileSink, FileSource};
pub use manager::{backup_file_name, AutoBackup, BackupInfo, BackupManager};
pub use progress::{ProgressObserver, ProgressReporter, ProgressSink, ProgressStage, ProgressState};
pub use reader::{
    load_verified, parse_document, validate_document, BackupReader, ImportOptions, ImportSummary,
};
pub use retention::rotate;
pub use writer::{AppInfo, BackupWriter, ExportOptions, ExportSummary};
