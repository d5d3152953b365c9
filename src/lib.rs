//! clipkeep - Backup and restore engine for clipboard history
//!
//! Exports a clipboard history (items and tags) into a single, self-describing
//! JSON document and restores such documents into a store, with per-item
//! encryption of secure entries, integrity checking, progress reporting and
//! rolling retention of automatic backups.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Clipboard items, tags and their ids
//! - `storage`: The store contract and its JSON file implementation
//! - `crypto`: Key derivation and the encryption provider
//! - `backup`: Export, import, progress and retention
//! - `cli`: Command handlers for the `clipkeep` binary
//! - `logging`: tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use clipkeep::backup::{BackupWriter, ExportOptions, FileSink};
//! use clipkeep::config::ClipPaths;
//! use clipkeep::storage::Storage;
//!
//! let paths = ClipPaths::new()?;
//! let storage = Storage::new(paths)?;
//! storage.load_all()?;
//!
//! let summary = BackupWriter::new(&storage)
//!     .export(&mut FileSink::new("history.clipbak"), &ExportOptions::default())?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;

pub use error::{ClipError, ClipResult};
