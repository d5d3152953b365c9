//! Integrity digest for backup documents
//!
//! The digest is SHA-256 over a canonical encoding of the item and tag
//! records. Each record is encoded as compact JSON (field order is fixed by the
//! struct definition), the encodings of each section are sorted, and the
//! sections are domain-separated. Record order in the document therefore does
//! not affect the digest, and neither does the metadata block.

use sha2::{Digest, Sha256};

use crate::error::{ClipError, ClipResult};

use super::document::{BackupItemRecord, BackupTagRecord};

const ITEMS_DOMAIN: &[u8] = b"clipkeep-items\n";
const TAGS_DOMAIN: &[u8] = b"clipkeep-tags\n";

/// Compute the hex digest over a set of item and tag records
pub fn compute_digest(
    items: &[BackupItemRecord],
    tags: &[BackupTagRecord],
) -> ClipResult<String> {
    let mut hasher = Sha256::new();

    hasher.update(ITEMS_DOMAIN);
    for line in canonical_lines(items)? {
        hasher.update(&line);
        hasher.update(b"\n");
    }

    hasher.update(TAGS_DOMAIN);
    for line in canonical_lines(tags)? {
        hasher.update(&line);
        hasher.update(b"\n");
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check a stored checksum against the records, case-insensitively
pub fn verify_digest(
    items: &[BackupItemRecord],
    tags: &[BackupTagRecord],
    expected: &str,
) -> ClipResult<()> {
    let actual = compute_digest(items, tags)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(ClipError::Integrity {
            expected: expected.to_string(),
            actual,
        })
    }
}

fn canonical_lines<T: serde::Serialize>(records: &[T]) -> ClipResult<Vec<Vec<u8>>> {
    let mut lines = records
        .iter()
        .map(serde_json::to_vec)
        .collect::<Result<Vec<_>, _>>()?;
    lines.sort_unstable();
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClipItem, Tag};

    fn sample() -> (Vec<BackupItemRecord>, Vec<BackupTagRecord>) {
        let items = vec![
            BackupItemRecord::from_item(&ClipItem::new("alpha")),
            BackupItemRecord::from_item(&ClipItem::new("beta").pinned()),
            BackupItemRecord::from_item(&ClipItem::new("gamma").with_tags(["x"])),
        ];
        let tags = vec![
            BackupTagRecord::from_tag(&Tag::new("x")),
            BackupTagRecord::from_tag(&Tag::new("y")),
        ];
        (items, tags)
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let (items, tags) = sample();
        let a = compute_digest(&items, &tags).unwrap();
        let b = compute_digest(&items, &tags).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_digest_is_order_independent() {
        let (mut items, mut tags) = sample();
        let before = compute_digest(&items, &tags).unwrap();

        items.reverse();
        tags.reverse();
        assert_eq!(compute_digest(&items, &tags).unwrap(), before);
    }

    #[test]
    fn test_digest_detects_content_change() {
        let (mut items, tags) = sample();
        let before = compute_digest(&items, &tags).unwrap();

        items[1].content.push('!');
        assert_ne!(compute_digest(&items, &tags).unwrap(), before);
    }

    #[test]
    fn test_digest_separates_sections() {
        let (items, tags) = sample();
        let digest = |i: &[BackupItemRecord], t: &[BackupTagRecord]| compute_digest(i, t).unwrap();
        assert_ne!(digest(&items, &[]), digest(&items, &tags));
        assert_ne!(digest(&[], &[]), digest(&items, &[]));
    }

    #[test]
    fn test_verify_digest() {
        let (items, tags) = sample();
        let digest = compute_digest(&items, &tags).unwrap();

        assert!(verify_digest(&items, &tags, &digest.to_uppercase()).is_ok());
        match verify_digest(&items, &tags, "deadbeef") {
            Err(ClipError::Integrity { expected, actual }) => {
                assert_eq!(expected, "deadbeef");
                assert_eq!(actual, digest);
            }
            other => panic!("expected integrity error, got {:?}", other),
        }
    }
}
