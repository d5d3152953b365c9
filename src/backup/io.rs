//! Byte sinks and sources
//!
//! The engine writes and reads whole documents through these opaque handles
//! and never depends on how they are addressed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ClipError, ClipResult};
use crate::storage::write_bytes_atomic;

/// Destination of a serialized backup
pub trait ByteSink {
    /// Write the complete document; called once per export
    fn write_all(&mut self, bytes: &[u8]) -> ClipResult<()>;

    /// Name shown in summaries
    fn name(&self) -> String {
        "stream".to_string()
    }
}

/// Origin of a serialized backup
pub trait ByteSource {
    /// Read the complete document
    fn read_all(&mut self) -> ClipResult<Vec<u8>>;

    /// Name shown in summaries
    fn name(&self) -> String {
        "stream".to_string()
    }
}

impl ByteSink for Vec<u8> {
    fn write_all(&mut self, bytes: &[u8]) -> ClipResult<()> {
        self.clear();
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

impl ByteSource for &[u8] {
    fn read_all(&mut self) -> ClipResult<Vec<u8>> {
        Ok(self.to_vec())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

/// Writes a backup to a file atomically
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSink for FileSink {
    fn write_all(&mut self, bytes: &[u8]) -> ClipResult<()> {
        write_bytes_atomic(&self.path, bytes).map_err(|e| {
            ClipError::Io(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }

    fn name(&self) -> String {
        file_name(&self.path)
    }
}

/// Reads a backup from a file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ByteSource for FileSource {
    fn read_all(&mut self) -> ClipResult<Vec<u8>> {
        fs::read(&self.path)
            .map_err(|e| ClipError::Io(format!("Failed to read {}: {}", self.path.display(), e)))
    }

    fn name(&self) -> String {
        file_name(&self.path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
