//! Item repository for JSON storage
//!
//! Manages loading and saving clipboard items to items.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::ClipError;
use crate::models::{ClipItem, ItemId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable item data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ItemData {
    items: Vec<ClipItem>,
}

/// Repository for clipboard item persistence
pub struct ItemRepository {
    path: PathBuf,
    data: RwLock<HashMap<ItemId, ClipItem>>,
}

impl ItemRepository {
    /// Create a new item repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load items from disk
    pub fn load(&self) -> Result<(), ClipError> {
        let file_data: ItemData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for item in file_data.items {
            data.insert(item.id, item);
        }

        Ok(())
    }

    /// Save items to disk, newest first
    pub fn save(&self) -> Result<(), ClipError> {
        let items = self.get_all()?;
        write_json_atomic(&self.path, &ItemData { items })
    }

    /// Get an item by ID
    pub fn get(&self, id: ItemId) -> Result<Option<ClipItem>, ClipError> {
        let data = self
            .data
            .read()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get all items, newest first
    pub fn get_all(&self) -> Result<Vec<ClipItem>, ClipError> {
        let data = self
            .data
            .read()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut items: Vec<_> = data.values().cloned().collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    /// Insert or replace an item
    pub fn upsert(&self, item: ClipItem) -> Result<(), ClipError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(item.id, item);
        Ok(())
    }

    /// Delete every item that is not pinned, returning how many were removed
    pub fn delete_unpinned(&self) -> Result<usize, ClipError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        let before = data.len();
        data.retain(|_, item| item.is_pinned);
        Ok(before - data.len())
    }

    /// Count items
    pub fn count(&self) -> Result<usize, ClipError> {
        let data = self
            .data
            .read()
            .map_err(|e| ClipError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.len())
    }
}
