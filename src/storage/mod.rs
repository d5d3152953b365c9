//! Storage layer for clipkeep
//!
//! Defines the [`ClipboardStore`] contract the backup engine consumes, and a
//! JSON file implementation of it with atomic writes.

pub mod file_io;
pub mod items;
pub mod tags;

pub use file_io::{read_json, write_bytes_atomic, write_json_atomic};
pub use items::ItemRepository;
pub use tags::TagRepository;

use crate::config::paths::ClipPaths;
use crate::error::ClipError;
use crate::models::{ClipItem, Tag};

/// The clipboard history store as seen by the backup engine
///
/// Implementations use interior mutability; the engine only ever holds a
/// shared reference.
pub trait ClipboardStore {
    /// All items currently in the store
    fn list_all_items(&self) -> Result<Vec<ClipItem>, ClipError>;

    /// All tags currently in the store
    fn list_all_tags(&self) -> Result<Vec<Tag>, ClipError>;

    /// Insert an item as a new row
    fn insert_item(&self, item: ClipItem) -> Result<(), ClipError>;

    /// Insert a tag, or replace the tag with the same id
    fn upsert_tag(&self, tag: Tag) -> Result<(), ClipError>;

    /// Delete every unpinned item, returning how many were removed
    fn delete_unpinned_items(&self) -> Result<usize, ClipError>;
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: ClipPaths,
    pub items: ItemRepository,
    pub tags: TagRepository,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: ClipPaths) -> Result<Self, ClipError> {
        paths.ensure_directories()?;

        Ok(Self {
            items: ItemRepository::new(paths.items_file()),
            tags: TagRepository::new(paths.tags_file()),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &ClipPaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&self) -> Result<(), ClipError> {
        self.items.load()?;
        self.tags.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), ClipError> {
        self.items.save()?;
        self.tags.save()?;
        Ok(())
    }
}

impl ClipboardStore for Storage {
    fn list_all_items(&self) -> Result<Vec<ClipItem>, ClipError> {
        self.items.get_all()
    }

    fn list_all_tags(&self) -> Result<Vec<Tag>, ClipError> {
        self.tags.get_all()
    }

    fn insert_item(&self, item: ClipItem) -> Result<(), ClipError> {
        if self.items.get(item.id)?.is_some() {
            return Err(ClipError::Storage(format!("Item {} already exists", item.id)));
        }
        self.items.upsert(item)
    }

    fn upsert_tag(&self, tag: Tag) -> Result<(), ClipError> {
        self.tags.upsert(tag)
    }

    fn delete_unpinned_items(&self) -> Result<usize, ClipError> {
        self.items.delete_unpinned()
    }
}
