//! Backup import
//!
//! Reads a document from a source, validates it completely (format, version,
//! consistency, checksum) before touching the destination store, then merges
//! tags and items. Once merging starts, failures of single tags or items are
//! logged, counted and skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::crypto::EncryptionProvider;
use crate::error::{ClipError, ClipResult};
use crate::models::Tag;
use crate::storage::ClipboardStore;

use super::cancel::CancellationToken;
use super::checksum::verify_digest;
use super::document::{BackupDocument, BackupItemRecord, BackupTagRecord, MAX_SUPPORTED_VERSION};
use super::io::ByteSource;
use super::progress::{ProgressReporter, ProgressStage};
use super::writer::scale;

/// Merge policy
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Delete all unpinned items before merging
    pub overwrite_existing: bool,
    /// Restore items flagged as secure
    pub restore_secure: bool,
    /// Skip items whose content and timestamp already exist
    pub dedupe: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            overwrite_existing: false,
            restore_secure: true,
            dedupe: false,
        }
    }
}

/// Outcome of a successful import
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub source_name: String,
    pub backup_version: u32,
    pub backup_created_at: Option<DateTime<Utc>>,
    pub total_items: usize,
    pub restored_items: usize,
    /// Secure items left out by policy
    pub skipped_secure: usize,
    /// Items already present (dedupe only)
    pub skipped_duplicates: usize,
    /// Items that failed to decrypt or insert
    pub failed_items: usize,
    pub total_tags: usize,
    pub restored_tags: usize,
    pub failed_tags: usize,
    /// Unpinned items removed before merging
    pub deleted_items: usize,
    pub duration: Duration,
    /// Preferences carried by the backup, for the caller to apply
    pub preferences: BTreeMap<String, String>,
}

impl ImportSummary {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Restored {}/{} items and {}/{} tags in {} ms",
            self.restored_items,
            self.total_items,
            self.restored_tags,
            self.total_tags,
            self.duration.as_millis()
        );
        if self.failed_items > 0 {
            text.push_str(&format!(", {} items failed", self.failed_items));
        }
        if self.skipped_secure > 0 {
            text.push_str(&format!(", {} secure items skipped", self.skipped_secure));
        }
        if self.skipped_duplicates > 0 {
            text.push_str(&format!(", {} duplicates skipped", self.skipped_duplicates));
        }
        text
    }
}

/// Parse a document from raw bytes
pub fn parse_document(bytes: &[u8]) -> ClipResult<BackupDocument> {
    BackupDocument::from_slice(bytes)
        .map_err(|e| ClipError::Format(format!("Failed to parse backup: {}", e)))
}

/// Check version, emptiness and metadata consistency
pub fn validate_document(document: &BackupDocument) -> ClipResult<()> {
    if document.version > MAX_SUPPORTED_VERSION {
        return Err(ClipError::UnsupportedVersion {
            found: document.version,
            max: MAX_SUPPORTED_VERSION,
        });
    }

    if document.items.is_empty() && document.tags.is_empty() {
        return Err(ClipError::EmptyBackup);
    }

    if document.metadata.total_items != document.items.len() {
        return Err(ClipError::Consistency(format!(
            "metadata lists {} items but the backup contains {}",
            document.metadata.total_items,
            document.items.len()
        )));
    }

    Ok(())
}

/// Parse, validate and verify a document without touching any store
pub fn load_verified(bytes: &[u8]) -> ClipResult<BackupDocument> {
    let document = parse_document(bytes)?;
    validate_document(&document)?;
    verify_digest(&document.items, &document.tags, &document.metadata.checksum)?;
    Ok(document)
}

/// Restores backup documents into a store
pub struct BackupReader<'a> {
    store: &'a dyn ClipboardStore,
    encryption: Option<&'a dyn EncryptionProvider>,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl<'a> BackupReader<'a> {
    /// Create a reader merging into `store`
    pub fn new(store: &'a dyn ClipboardStore) -> Self {
        Self {
            store,
            encryption: None,
            progress: ProgressReporter::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an encryption provider for encrypted items
    pub fn with_encryption(mut self, provider: &'a dyn EncryptionProvider) -> Self {
        self.encryption = Some(provider);
        self
    }

    /// Publish progress through an existing reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Stop between steps once the token is cancelled
    ///
    /// Cancelling after merging started keeps what was already merged.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The reporter this reader publishes to
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Read and fully validate a backup without touching any store
    pub fn inspect(source: &mut dyn ByteSource) -> ClipResult<BackupDocument> {
        load_verified(&source.read_all()?)
    }

    /// Import a backup from `source` into the store
    pub fn import(
        &self,
        source: &mut dyn ByteSource,
        options: &ImportOptions,
    ) -> ClipResult<ImportSummary> {
        self.progress.begin();
        let started = Instant::now();

        match self.run(source, options, started) {
            Ok(summary) => {
                info!(
                    restored_items = summary.restored_items,
                    total_items = summary.total_items,
                    failed_items = summary.failed_items,
                    restored_tags = summary.restored_tags,
                    "Import completed"
                );
                self.progress.complete(summary.summary());
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Import failed");
                self.progress.fail(&e);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        source: &mut dyn ByteSource,
        options: &ImportOptions,
        started: Instant,
    ) -> ClipResult<ImportSummary> {
        self.progress
            .report(ProgressStage::Restoring, 0, "Reading backup");
        let bytes = source.read_all()?;
        let document = parse_document(&bytes)?;
        debug!(bytes = bytes.len(), version = document.version, "Backup parsed");

        self.progress
            .report(ProgressStage::Validating, 20, "Validating backup");
        validate_document(&document)?;
        self.progress
            .report(ProgressStage::Validating, 30, "Verifying checksum");
        verify_digest(&document.items, &document.tags, &document.metadata.checksum)?;

        // Last point at which the store is guaranteed untouched
        self.cancel.check()?;

        let mut summary = ImportSummary {
            source_name: source.name(),
            backup_version: document.version,
            backup_created_at: Some(document.created_at),
            total_items: document.items.len(),
            total_tags: document.tags.len(),
            preferences: document.preferences.clone(),
            ..ImportSummary::default()
        };

        if options.overwrite_existing {
            summary.deleted_items = self.store.delete_unpinned_items()?;
            info!(deleted = summary.deleted_items, "Removed unpinned items before restore");
            self.progress.report(
                ProgressStage::Cleanup,
                40,
                format!("Removed {} unpinned items", summary.deleted_items),
            );
        } else {
            self.progress
                .report(ProgressStage::Cleanup, 40, "Keeping existing items");
        }

        self.merge_tags(&document.tags, &mut summary)?;
        self.progress.report(
            ProgressStage::WritingDatabase,
            60,
            format!("Restored {}/{} tags", summary.restored_tags, summary.total_tags),
        );

        self.merge_items(&document.items, options, &mut summary)?;

        summary.duration = started.elapsed();
        Ok(summary)
    }

    /// Upsert tags by name, accumulating usage of tags that already exist
    fn merge_tags(
        &self,
        records: &[BackupTagRecord],
        summary: &mut ImportSummary,
    ) -> ClipResult<()> {
        let mut by_name: HashMap<String, Tag> = self
            .store
            .list_all_tags()?
            .into_iter()
            .map(|tag| (Tag::normalize_name(&tag.name), tag))
            .collect();

        for record in records {
            self.cancel.check()?;

            let key = Tag::normalize_name(&record.name);
            if key.is_empty() {
                warn!(tag = %record.id, "Skipping tag with empty name");
                summary.failed_tags += 1;
                continue;
            }

            let tag = match by_name.get(&key) {
                Some(existing) => {
                    let mut merged = existing.clone();
                    merged.usage_count = merged.usage_count.saturating_add(record.usage_count);
                    merged
                }
                None => record.to_tag(),
            };

            match self.store.upsert_tag(tag.clone()) {
                Ok(()) => {
                    by_name.insert(key, tag);
                    summary.restored_tags += 1;
                }
                Err(e) => {
                    warn!(tag = %record.name, error = %e, "Failed to restore tag");
                    summary.failed_tags += 1;
                }
            }
        }

        Ok(())
    }

    /// Insert every restorable item as a new row
    fn merge_items(
        &self,
        records: &[BackupItemRecord],
        options: &ImportOptions,
        summary: &mut ImportSummary,
    ) -> ClipResult<()> {
        let mut seen: HashSet<(String, DateTime<Utc>)> = if options.dedupe {
            self.store
                .list_all_items()?
                .into_iter()
                .map(|item| (item.content, item.timestamp))
                .collect()
        } else {
            HashSet::new()
        };

        let total = records.len();
        for (index, record) in records.iter().enumerate() {
            self.cancel.check()?;
            self.merge_item(record, options, &mut seen, summary);

            let done = index + 1;
            self.progress.report_items(
                ProgressStage::WritingDatabase,
                scale(60, 90, done, total),
                format!("Restored {}/{} items", summary.restored_items, total),
                done,
                total,
            );
        }

        Ok(())
    }

    fn merge_item(
        &self,
        record: &BackupItemRecord,
        options: &ImportOptions,
        seen: &mut HashSet<(String, DateTime<Utc>)>,
        summary: &mut ImportSummary,
    ) {
        if record.is_secure && !options.restore_secure {
            summary.skipped_secure += 1;
            return;
        }

        let content = if record.is_encrypted {
            match self.decrypt(&record.content) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    warn!(item = %record.id, error = %e, "Failed to decrypt item");
                    summary.failed_items += 1;
                    return;
                }
            }
        } else {
            record.content.clone()
        };

        let key = (content, record.timestamp);
        if options.dedupe && seen.contains(&key) {
            summary.skipped_duplicates += 1;
            return;
        }

        let item = record.to_item(key.0.clone());
        match self.store.insert_item(item) {
            Ok(()) => {
                summary.restored_items += 1;
                if options.dedupe {
                    seen.insert(key);
                }
            }
            Err(e) => {
                warn!(item = %record.id, error = %e, "Failed to restore item");
                summary.failed_items += 1;
            }
        }
    }

    fn decrypt(&self, ciphertext: &str) -> ClipResult<String> {
        match self.encryption {
            Some(provider) => provider.decrypt(ciphertext),
            None => Err(ClipError::Encryption(
                "No encryption provider configured".to_string(),
            )),
        }
    }
}
