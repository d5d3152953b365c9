//! Tag repository for JSON storage
//!
//! Manages loading and saving tags to tags.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::ClipError;
use crate::models::{Tag, TagId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable tag data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TagData {
    tags: Vec<Tag>,
}

/// Repository for tag persistence
pub struct TagRepository {
    path: PathBuf,
    data: RwLock<HashMap<TagId, Tag>>,
    /// Index: normalized name -> tag_id
    by_name: RwLock<HashMap<String, TagId>>,
}

impl TagRepository {
    /// Create a new tag repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
        }
    }

    /// Load tags from disk
    pub fn load(&self) -> Result<(), ClipError> {
        let file_data: TagData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_name = self
            .by_name
            .write()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        by_name.clear();

        for tag in file_data.tags {
            by_name.insert(Tag::normalize_name(&tag.name), tag.id);
            data.insert(tag.id, tag);
        }

        Ok(())
    }

    /// Save tags to disk
    pub fn save(&self) -> Result<(), ClipError> {
        let tags = self.get_all()?;
        write_json_atomic(&self.path, &TagData { tags })
    }

    /// Get all tags sorted by name
    pub fn get_all(&self) -> Result<Vec<Tag>, ClipError> {
        let data = self
            .data
            .read()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut tags: Vec<_> = data.values().cloned().collect();
        tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(tags)
    }

    /// Get a tag by exact name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Result<Option<Tag>, ClipError> {
        let data = self
            .data
            .read()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        let by_name = self
            .by_name
            .read()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(by_name
            .get(&Tag::normalize_name(name))
            .and_then(|id| data.get(id).cloned()))
    }

    /// Insert or update a tag
    pub fn upsert(&self, tag: Tag) -> Result<(), ClipError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_name = self
            .by_name
            .write()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        // Remove old name index if updating
        if let Some(old) = data.get(&tag.id) {
            by_name.remove(&Tag::normalize_name(&old.name));
        }

        by_name.insert(Tag::normalize_name(&tag.name), tag.id);
        data.insert(tag.id, tag);
        Ok(())
    }

    /// Count tags
    pub fn count(&self) -> Result<usize, ClipError> {
        let data = self
            .data
            .read()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.len())
    }
}
