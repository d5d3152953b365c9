//! Core data models for clipkeep
//!
//! This module contains the store-side entities of the clipboard history:
//! items and tags.

pub mod ids;
pub mod item;
pub mod tag;

pub use ids::{ItemId, TagId};
pub use item::{ClipItem, ClipKind};
pub use tag::{Tag, DEFAULT_TAG_COLOR};
