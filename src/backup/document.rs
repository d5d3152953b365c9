//! Backup document format
//!
//! A backup is a single UTF-8 JSON document holding the clipboard history,
//! its tags, opaque preferences and a metadata block with counts and the
//! integrity checksum.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ClipItem, ClipKind, Tag, TagId};

/// Format version written by this build
pub const BACKUP_FORMAT_VERSION: u32 = 2;

/// Newest format version this build can read
pub const MAX_SUPPORTED_VERSION: u32 = 2;

/// File extension of backup documents (without the dot)
pub const BACKUP_EXTENSION: &str = "clipbak";

/// Characters kept in an item preview
pub const PREVIEW_CHARS: usize = 80;

/// Preview stored for encrypted items
pub const ENCRYPTED_PREVIEW: &str = "••••••";

/// The complete backup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    /// Format version, gated on read
    pub version: u32,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// Version of the application that wrote the backup
    pub app_version: String,
    /// Free-form description of the writing device
    #[serde(default)]
    pub device_info: String,
    /// Clipboard items
    #[serde(default)]
    pub items: Vec<BackupItemRecord>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<BackupTagRecord>,
    /// Application preferences carried along with the history
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
    /// Counts, checksum and provenance
    pub metadata: BackupMetadata,
}

/// A clipboard item as stored in a backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupItemRecord {
    pub id: String,
    /// Plaintext, or ciphertext when `is_encrypted`
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub item_type: String,
    pub is_pinned: bool,
    pub is_secure: bool,
    /// Comma-separated tag names
    pub tags: String,
    pub preview: String,
    pub is_encrypted: bool,
    /// Character count of the plaintext content
    pub original_length: usize,
}

impl BackupItemRecord {
    /// Build a plaintext record from a store item
    pub fn from_item(item: &ClipItem) -> Self {
        Self {
            id: item.id.as_uuid().to_string(),
            content: item.content.clone(),
            timestamp: item.timestamp,
            item_type: item.kind.as_str().to_string(),
            is_pinned: item.is_pinned,
            is_secure: item.is_secure,
            tags: item.tags_csv(),
            preview: item.preview(PREVIEW_CHARS),
            is_encrypted: false,
            original_length: item.content.chars().count(),
        }
    }

    /// Replace the content with ciphertext and mask the preview
    pub fn into_encrypted(mut self, ciphertext: String) -> Self {
        self.content = ciphertext;
        self.preview = ENCRYPTED_PREVIEW.to_string();
        self.is_encrypted = true;
        self
    }

    /// Build a store item from this record with the given plaintext
    ///
    /// The item receives a fresh id; ids from another store carry no meaning.
    pub fn to_item(&self, content: String) -> ClipItem {
        ClipItem {
            content,
            timestamp: self.timestamp,
            kind: ClipKind::parse_lossy(&self.item_type),
            is_pinned: self.is_pinned,
            is_secure: self.is_secure,
            tags: ClipItem::parse_tags_csv(&self.tags),
            ..ClipItem::new("")
        }
    }
}

/// A tag as stored in a backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupTagRecord {
    pub id: String,
    pub name: String,
    pub color: String,
    pub usage_count: u32,
    pub created_at: DateTime<Utc>,
}

impl BackupTagRecord {
    /// Build a record from a store tag
    pub fn from_tag(tag: &Tag) -> Self {
        Self {
            id: tag.id.as_uuid().to_string(),
            name: tag.name.clone(),
            color: tag.color.clone(),
            usage_count: tag.usage_count,
            created_at: tag.created_at,
        }
    }

    /// Build a new store tag from this record, with a fresh id
    pub fn to_tag(&self) -> Tag {
        Tag {
            id: TagId::new(),
            name: self.name.clone(),
            color: self.color.clone(),
            usage_count: self.usage_count,
            created_at: self.created_at,
        }
    }
}

/// Metadata block of a backup document
///
/// Not covered by the checksum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub total_items: usize,
    pub secure_items: usize,
    pub pinned_items: usize,
    pub total_tags: usize,
    /// Byte length of the serialized document
    pub backup_size: u64,
    #[serde(default)]
    pub device_model: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub app_version_code: u32,
    /// Hex SHA-256 over the canonical items and tags
    pub checksum: String,
    #[serde(default)]
    pub language: String,
}

impl BackupDocument {
    /// Whether any item in the document is encrypted
    pub fn has_encrypted_items(&self) -> bool {
        self.items.iter().any(|i| i.is_encrypted)
    }

    /// Parse a document from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Serialize the document as pretty JSON
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_record_round_trip() {
        let item = ClipItem::new("https://example.com")
            .with_kind(ClipKind::Url)
            .pinned()
            .with_tags(["links", "work"]);

        let record = BackupItemRecord::from_item(&item);
        assert_eq!(record.item_type, "URL");
        assert_eq!(record.tags, "links,work");
        assert!(!record.is_encrypted);
        assert_eq!(record.original_length, 19);

        let restored = record.to_item(record.content.clone());
        assert_ne!(restored.id, item.id);
        assert_eq!(restored.content, item.content);
        assert_eq!(restored.timestamp, item.timestamp);
        assert_eq!(restored.kind, item.kind);
        assert_eq!(restored.tags, item.tags);
        assert!(restored.is_pinned);
    }

    #[test]
    fn test_item_record_keeps_unusual_tag_names() {
        let item = ClipItem::new("contact").with_tags(["Smith, John", " padded "]);
        let record = BackupItemRecord::from_item(&item);

        assert_eq!(record.to_item(record.content.clone()).tags, item.tags);
    }

    #[test]
    fn test_encrypted_record_masks_preview() {
        let item = ClipItem::new("hunter2").secure();
        let record = BackupItemRecord::from_item(&item).into_encrypted("v1:xyz".into());

        assert!(record.is_encrypted);
        assert_eq!(record.content, "v1:xyz");
        assert_eq!(record.preview, ENCRYPTED_PREVIEW);
        assert_eq!(record.original_length, 7);
    }

    #[test]
    fn test_tag_record_gets_fresh_id() {
        let tag = Tag::new(" Work ").with_usage(2);
        let record = BackupTagRecord::from_tag(&tag);
        let restored = record.to_tag();

        assert_ne!(restored.id, tag.id);
        assert_eq!(restored.name, " Work ");
        assert_eq!(restored.usage_count, 2);
    }

    #[test]
    fn test_optional_sections_default_when_missing() {
        let json = r#"{
            "version": 1,
            "created_at": "2025-01-02T03:04:05Z",
            "app_version": "0.0.9",
            "metadata": {
                "total_items": 0, "secure_items": 0, "pinned_items": 0,
                "total_tags": 0, "backup_size": 0, "checksum": ""
            }
        }"#;

        let doc = BackupDocument::from_slice(json.as_bytes()).unwrap();
        assert!(doc.items.is_empty());
        assert!(doc.tags.is_empty());
        assert!(doc.preferences.is_empty());
        assert_eq!(doc.device_info, "");
    }
}
