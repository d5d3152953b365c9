//! Tag model
//!
//! Tags group clipboard items. In the store a tag is identified by its id,
//! but across stores (backup and restore) tags are matched by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TagId;

/// Default tag color
pub const DEFAULT_TAG_COLOR: &str = "#607D8B";

/// A user-defined tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: TagId,

    /// Display name
    pub name: String,

    /// Color as a hex string
    #[serde(default = "default_color")]
    pub color: String,

    /// Number of times the tag was applied
    #[serde(default)]
    pub usage_count: u32,

    /// When the tag was created
    pub created_at: DateTime<Utc>,
}

fn default_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

impl Tag {
    /// Create a new tag
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TagId::new(),
            name: name.into(),
            color: default_color(),
            usage_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Set the color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Set the usage count
    pub fn with_usage(mut self, usage_count: u32) -> Self {
        self.usage_count = usage_count;
        self
    }

    /// Normalize a tag name for matching (lowercase, trimmed)
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tag() {
        let tag = Tag::new("Work").with_usage(3);
        assert_eq!(tag.name, "Work");
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
        assert_eq!(tag.usage_count, 3);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(Tag::normalize_name("  Work "), "work");
        assert_eq!(Tag::normalize_name("WORK"), Tag::normalize_name("work"));
    }
}
