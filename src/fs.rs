//! File system helpers
//!
//! Atomic writes via tempfile + rename, and SHA-256 content hashing used by
//! the asset collector and the ledgers.

use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::RolloutResult;

/// Write content to a file atomically.
///
/// Writes to a temporary file in the destination's parent directory, then
/// renames into place. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> RolloutResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Compute the SHA-256 digest of a byte slice, `sha256:`-prefixed hex.
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{:x}", hasher.finalize())
}

/// Compute the SHA-256 digest of a file's content.
pub fn hash_file(path: &Path) -> RolloutResult<String> {
    let content = std::fs::read(path)?;
    Ok(hash_content(&content))
}
