//! Rolling retention of automatic backups

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::error::{ClipError, ClipResult};

use super::document::BACKUP_EXTENSION;

/// Number of automatic backups kept when nothing else is configured
pub const DEFAULT_KEEP_COUNT: usize = 5;

/// Delete all but the `keep` most recent backups in `dir`
///
/// Only files with the backup extension are considered. Recency is the
/// modification time, ties broken by file name (names embed the timestamp).
/// Deletion is best-effort: a file that cannot be removed is logged and
/// skipped. Returns the paths that were deleted.
pub fn rotate(dir: &Path, keep: usize) -> ClipResult<Vec<PathBuf>> {
    let mut backups = match list_backup_files(dir) {
        Ok(files) => files,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ClipError::Io(format!(
                "Failed to read backup directory {}: {}",
                dir.display(),
                e
            )))
        }
    };

    backups.sort_by(|(a_path, a_time), (b_path, b_time)| {
        b_time.cmp(a_time).then_with(|| b_path.file_name().cmp(&a_path.file_name()))
    });

    let mut deleted = Vec::new();
    for (path, _) in backups.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted old backup");
                deleted.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old backup"),
        }
    }

    Ok(deleted)
}

/// Backup files in `dir` with their modification times
pub(crate) fn list_backup_files(dir: &Path) -> io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_backup_file(&path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((path, modified));
    }
    Ok(files)
}

/// Whether `path` carries the backup extension
pub fn is_backup_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == BACKUP_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn test_keeps_most_recent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        // Names sort opposite to age to prove mtime wins
        let oldest = touch(dir, "clipkeep-f.clipbak", 600);
        let second_oldest = touch(dir, "clipkeep-e.clipbak", 500);
        for (i, name) in ["d", "c", "b", "a"].iter().enumerate() {
            touch(dir, &format!("clipkeep-{}.clipbak", name), 400 - i as u64 * 100);
        }

        let mut deleted = rotate(dir, 4).unwrap();
        deleted.sort();

        let mut expected = vec![oldest, second_oldest];
        expected.sort();
        assert_eq!(deleted, expected);
        assert_eq!(list_backup_files(dir).unwrap().len(), 4);
    }

    #[test]
    fn test_ties_break_on_name() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let now = SystemTime::now();
        for name in ["clipkeep-1", "clipkeep-2", "clipkeep-3"] {
            let file = File::create(dir.join(format!("{}.clipbak", name))).unwrap();
            file.set_modified(now).unwrap();
        }

        let deleted = rotate(dir, 2).unwrap();
        assert_eq!(deleted, vec![dir.join("clipkeep-1.clipbak")]);
    }

    #[test]
    fn test_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        touch(dir, "notes.txt", 1000);
        touch(dir, "clipkeep-a.clipbak", 10);

        let deleted = rotate(dir, 0).unwrap();
        assert_eq!(deleted, vec![dir.join("clipkeep-a.clipbak")]);
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let deleted = rotate(&temp_dir.path().join("missing"), 5).unwrap();
        assert!(deleted.is_empty());
    }
}
