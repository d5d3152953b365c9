//! Clipboard item model
//!
//! A single entry in the clipboard history. The `is_secure` flag is set by an
//! external classifier and only consumed here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::ItemId;

/// Kind of content captured from the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClipKind {
    #[default]
    Text,
    Url,
    Email,
    Phone,
    Code,
    Image,
    File,
}

impl ClipKind {
    /// Wire name used in backup documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Url => "URL",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Code => "CODE",
            Self::Image => "IMAGE",
            Self::File => "FILE",
        }
    }

    /// Parse a wire name; unknown names fall back to `Text`
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "URL" => Self::Url,
            "EMAIL" => Self::Email,
            "PHONE" => Self::Phone,
            "CODE" => Self::Code,
            "IMAGE" => Self::Image,
            "FILE" => Self::File,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for ClipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A clipboard history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipItem {
    /// Unique identifier
    pub id: ItemId,

    /// Captured content
    pub content: String,

    /// When the content was captured
    pub timestamp: DateTime<Utc>,

    /// Content kind
    #[serde(default)]
    pub kind: ClipKind,

    /// Pinned items survive history cleanup
    #[serde(default)]
    pub is_pinned: bool,

    /// Flagged as sensitive by the classifier
    #[serde(default)]
    pub is_secure: bool,

    /// Tag names attached to this item
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ClipItem {
    /// Create a new plain text item captured now
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            content: content.into(),
            timestamp: Utc::now(),
            kind: ClipKind::Text,
            is_pinned: false,
            is_secure: false,
            tags: Vec::new(),
        }
    }

    /// Set the content kind
    pub fn with_kind(mut self, kind: ClipKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the item as pinned
    pub fn pinned(mut self) -> Self {
        self.is_pinned = true;
        self
    }

    /// Mark the item as secure
    pub fn secure(mut self) -> Self {
        self.is_secure = true;
        self
    }

    /// Attach tags by name
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Tags joined as a comma-separated list
    ///
    /// Commas and backslashes inside a name are escaped with a backslash, so
    /// every name survives [`ClipItem::parse_tags_csv`] unchanged.
    pub fn tags_csv(&self) -> String {
        self.tags
            .iter()
            .map(|tag| tag.replace('\\', "\\\\").replace(',', "\\,"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Split a comma-separated tag list, dropping empty entries
    pub fn parse_tags_csv(csv: &str) -> Vec<String> {
        let mut tags = Vec::new();
        let mut current = String::new();
        let mut chars = csv.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => current.extend(chars.next()),
                ',' => tags.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        tags.push(current);

        tags.retain(|t| !t.is_empty());
        tags
    }

    /// Short single-line preview of the content
    pub fn preview(&self, max_chars: usize) -> String {
        let line = self.content.lines().next().unwrap_or_default();
        let mut preview: String = line.chars().take(max_chars).collect();
        if line.chars().count() > max_chars || self.content.lines().nth(1).is_some() {
            preview.push('…');
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_defaults() {
        let item = ClipItem::new("hello");
        assert_eq!(item.kind, ClipKind::Text);
        assert!(!item.is_pinned);
        assert!(!item.is_secure);
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_tags_csv_round_trip() {
        let item = ClipItem::new("x").with_tags(["work", "links"]);
        assert_eq!(item.tags_csv(), "work,links");
        assert_eq!(ClipItem::parse_tags_csv("work,,links,"), vec!["work", "links"]);
        assert!(ClipItem::parse_tags_csv("").is_empty());
    }

    #[test]
    fn test_tags_csv_keeps_commas_and_spaces() {
        let item = ClipItem::new("x").with_tags(["Smith, John", " padded ", "back\\slash"]);
        let csv = item.tags_csv();
        assert_eq!(csv, "Smith\\, John, padded ,back\\\\slash");
        assert_eq!(ClipItem::parse_tags_csv(&csv), item.tags);
    }

    #[test]
    fn test_preview_truncates() {
        let item = ClipItem::new("abcdefghij");
        assert_eq!(item.preview(4), "abcd…");
        assert_eq!(item.preview(20), "abcdefghij");

        let multi = ClipItem::new("first\nsecond");
        assert_eq!(multi.preview(20), "first…");
    }

    #[test]
    fn test_kind_parse_lossy() {
        assert_eq!(ClipKind::parse_lossy("url"), ClipKind::Url);
        assert_eq!(ClipKind::parse_lossy("CODE"), ClipKind::Code);
        assert_eq!(ClipKind::parse_lossy("HOLOGRAM"), ClipKind::Text);
        assert_eq!(ClipKind::parse_lossy(ClipKind::Email.as_str()), ClipKind::Email);
    }
}
