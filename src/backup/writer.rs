//! Backup export
//!
//! Reads a point-in-time snapshot of the store, filters and transforms the
//! items, stamps metadata and checksum, and writes the serialized document to
//! a sink.
//!
//! The snapshot is best effort: items and tags are read with one call each and
//! nothing isolates them from a store that is mutated concurrently.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::crypto::EncryptionProvider;
use crate::error::{ClipError, ClipResult};
use crate::models::ClipItem;
use crate::storage::ClipboardStore;

use super::cancel::CancellationToken;
use super::checksum::compute_digest;
use super::document::{
    BackupDocument, BackupItemRecord, BackupMetadata, BackupTagRecord, BACKUP_FORMAT_VERSION,
};
use super::io::ByteSink;
use super::progress::{ProgressReporter, ProgressStage};

/// Provenance recorded in every backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub app_version: String,
    pub app_version_code: u32,
    pub device_model: String,
    pub os_version: String,
    pub language: String,
}

impl AppInfo {
    /// Information about the running build and host
    pub fn current() -> Self {
        let app_version = env!("CARGO_PKG_VERSION").to_string();
        Self {
            app_version_code: version_code(&app_version),
            app_version,
            device_model: std::env::consts::ARCH.to_string(),
            os_version: std::env::consts::OS.to_string(),
            language: "en".to_string(),
        }
    }

    /// Override the device model
    pub fn with_device_model(mut self, device_model: impl Into<String>) -> Self {
        self.device_model = device_model.into();
        self
    }

    /// Override the language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn device_info(&self) -> String {
        format!("{} ({})", self.device_model, self.os_version)
    }
}

/// `major.minor.patch` as `major * 10000 + minor * 100 + patch`
fn version_code(version: &str) -> u32 {
    version
        .split('.')
        .take(3)
        .map(|part| part.parse::<u32>().unwrap_or(0))
        .chain(std::iter::repeat(0))
        .take(3)
        .fold(0, |acc, part| acc * 100 + part.min(99))
}

/// Export policy
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Include items flagged as secure
    pub include_secure: bool,
    /// Encrypt included secure items
    pub encrypt_secure: bool,
    /// Preferences copied verbatim into the document
    pub preferences: BTreeMap<String, String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_secure: true,
            encrypt_secure: true,
            preferences: BTreeMap::new(),
        }
    }
}

/// Outcome of a successful export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub file_name: String,
    pub size_bytes: u64,
    pub duration: Duration,
    pub item_count: usize,
    pub tag_count: usize,
    pub secure_count: usize,
    pub encrypted_count: usize,
    /// Secure items left out because encryption failed
    pub skipped_items: usize,
    pub checksum: String,
}

impl ExportSummary {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Exported {} items and {} tags to {} ({} bytes) in {} ms",
            self.item_count,
            self.tag_count,
            self.file_name,
            self.size_bytes,
            self.duration.as_millis()
        );
        if self.skipped_items > 0 {
            text.push_str(&format!(", {} items skipped", self.skipped_items));
        }
        text
    }
}

/// Serializes the store into backup documents
pub struct BackupWriter<'a> {
    store: &'a dyn ClipboardStore,
    encryption: Option<&'a dyn EncryptionProvider>,
    progress: ProgressReporter,
    app: AppInfo,
    cancel: CancellationToken,
}

impl<'a> BackupWriter<'a> {
    /// Create a writer over a store
    pub fn new(store: &'a dyn ClipboardStore) -> Self {
        Self {
            store,
            encryption: None,
            progress: ProgressReporter::new(),
            app: AppInfo::current(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an encryption provider for secure items
    pub fn with_encryption(mut self, provider: &'a dyn EncryptionProvider) -> Self {
        self.encryption = Some(provider);
        self
    }

    /// Publish progress through an existing reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Record the given provenance
    pub fn with_app_info(mut self, app: AppInfo) -> Self {
        self.app = app;
        self
    }

    /// Stop between steps once the token is cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The reporter this writer publishes to
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Export the store into `sink`
    ///
    /// Per-item encryption failures skip the item and are counted in the
    /// summary; every other failure aborts the export.
    pub fn export(
        &self,
        sink: &mut dyn ByteSink,
        options: &ExportOptions,
    ) -> ClipResult<ExportSummary> {
        self.progress.begin();
        let started = Instant::now();

        match self.run(sink, options, started) {
            Ok(summary) => {
                info!(
                    items = summary.item_count,
                    tags = summary.tag_count,
                    skipped = summary.skipped_items,
                    bytes = summary.size_bytes,
                    "Export completed"
                );
                self.progress.complete(summary.summary());
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Export failed");
                self.progress.fail(&e);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        sink: &mut dyn ByteSink,
        options: &ExportOptions,
        started: Instant,
    ) -> ClipResult<ExportSummary> {
        self.progress
            .report(ProgressStage::Preparing, 0, "Preparing backup");
        self.cancel.check()?;

        let items = self.store.list_all_items()?;
        let tags = self.store.list_all_tags()?;
        self.progress.report(
            ProgressStage::Reading,
            10,
            format!("Read {} items and {} tags", items.len(), tags.len()),
        );
        debug!(items = items.len(), tags = tags.len(), "Snapshot taken");

        let selected: Vec<&ClipItem> = items
            .iter()
            .filter(|item| options.include_secure || !item.is_secure)
            .collect();
        if selected.len() < items.len() {
            debug!(excluded = items.len() - selected.len(), "Secure items excluded");
        }

        let (records, skipped_items) = self.transform_items(&selected, options)?;
        let tag_records: Vec<BackupTagRecord> = tags.iter().map(BackupTagRecord::from_tag).collect();

        if records.is_empty() && tag_records.is_empty() {
            warn!("Backup contains no items and no tags and cannot be restored");
        }

        self.cancel.check()?;
        let checksum = compute_digest(&records, &tag_records)?;
        let metadata = BackupMetadata {
            total_items: records.len(),
            secure_items: records.iter().filter(|r| r.is_secure).count(),
            pinned_items: records.iter().filter(|r| r.is_pinned).count(),
            total_tags: tag_records.len(),
            backup_size: 0,
            device_model: self.app.device_model.clone(),
            os_version: self.app.os_version.clone(),
            app_version_code: self.app.app_version_code,
            checksum: checksum.clone(),
            language: self.app.language.clone(),
        };
        self.progress
            .report(ProgressStage::Encrypting, 60, "Checksum computed");

        let mut document = BackupDocument {
            version: BACKUP_FORMAT_VERSION,
            created_at: Utc::now(),
            app_version: self.app.app_version.clone(),
            device_info: self.app.device_info(),
            items: records,
            tags: tag_records,
            preferences: options.preferences.clone(),
            metadata,
        };
        let bytes = serialize_with_size(&mut document)?;
        self.progress.report(
            ProgressStage::Writing,
            80,
            format!("Writing {} bytes", bytes.len()),
        );

        self.cancel.check()?;
        sink.write_all(&bytes)?;

        Ok(ExportSummary {
            file_name: sink.name(),
            size_bytes: document.metadata.backup_size,
            duration: started.elapsed(),
            item_count: document.metadata.total_items,
            tag_count: document.metadata.total_tags,
            secure_count: document.metadata.secure_items,
            encrypted_count: document.items.iter().filter(|r| r.is_encrypted).count(),
            skipped_items,
            checksum,
        })
    }

    /// Build records for the selected items, encrypting secure ones on request
    fn transform_items(
        &self,
        selected: &[&ClipItem],
        options: &ExportOptions,
    ) -> ClipResult<(Vec<BackupItemRecord>, usize)> {
        let total = selected.len();
        let mut records = Vec::with_capacity(total);
        let mut skipped = 0;

        if total == 0 {
            self.progress
                .report(ProgressStage::Processing, 50, "No items to process");
        }

        for (index, item) in selected.iter().enumerate() {
            self.cancel.check()?;

            let record = BackupItemRecord::from_item(item);
            if item.is_secure && options.encrypt_secure {
                match self.encrypt(&item.content) {
                    Ok(ciphertext) => records.push(record.into_encrypted(ciphertext)),
                    Err(e) => {
                        // Never fall back to plaintext
                        warn!(item = %item.id, error = %e, "Skipping secure item: encryption failed");
                        skipped += 1;
                    }
                }
            } else {
                records.push(record);
            }

            let done = index + 1;
            self.progress.report_items(
                ProgressStage::Processing,
                scale(20, 50, done, total),
                format!("Processed {}/{} items", done, total),
                done,
                total,
            );
        }

        Ok((records, skipped))
    }

    fn encrypt(&self, plaintext: &str) -> ClipResult<String> {
        match self.encryption {
            Some(provider) => provider.encrypt(plaintext),
            None => Err(ClipError::Encryption(
                "No encryption provider configured".to_string(),
            )),
        }
    }
}

/// Serialize the document with `metadata.backup_size` equal to its own length
///
/// The size is not covered by the checksum, so stamping it needs no rehash.
fn serialize_with_size(document: &mut BackupDocument) -> ClipResult<Vec<u8>> {
    document.metadata.backup_size = 0;
    let mut bytes = document.to_bytes()?;
    // Stamping the size can add digits; converges after at most two passes
    while document.metadata.backup_size != bytes.len() as u64 {
        document.metadata.backup_size = bytes.len() as u64;
        bytes = document.to_bytes()?;
    }
    Ok(bytes)
}

/// Linear percent between `from` and `to` for `done` of `total` steps
pub(crate) fn scale(from: u8, to: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return to;
    }
    let span = usize::from(to.saturating_sub(from));
    let step = span * done.min(total) / total;
    from + step as u8
}
