//! Custom error types for clipkeep
//!
//! This module defines the error hierarchy for the backup engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for clipkeep operations
#[derive(Error, Debug)]
pub enum ClipError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sink/source or file I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Backup document could not be decoded
    #[error("Format error: {0}")]
    Format(String),

    /// Backup document was written by a newer format version
    #[error("Unsupported backup version {found} (max supported: {max})")]
    UnsupportedVersion { found: u32, max: u32 },

    /// Backup document contains neither items nor tags
    #[error("Backup contains no items and no tags")]
    EmptyBackup,

    /// Metadata disagrees with the document contents
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Checksum recomputed on read does not match the stored one
    #[error("Integrity check failed: expected checksum {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Operation stopped through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,
}

impl ClipError {
    /// Create a "not found" error for backup files
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error was raised while validating a backup document
    ///
    /// Validation errors are always detected before the destination store
    /// is touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Format(_)
                | Self::UnsupportedVersion { .. }
                | Self::EmptyBackup
                | Self::Consistency(_)
                | Self::Integrity { .. }
        )
    }
}

impl From<std::io::Error> for ClipError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClipError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}

/// Result type alias for clipkeep operations
pub type ClipResult<T> = Result<T, ClipError>;
