//! Static asset collection (Step B)
//!
//! Walks the asset source tree and copies every file into the serving
//! directory, overwriting without confirmation. Files whose destination
//! already has identical content (same SHA-256) are skipped, so a re-run on
//! an unchanged tree writes nothing.
//!
//! A `.rolloutignore` file at the source root is honored with gitignore
//! semantics.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{RolloutError, RolloutResult};
use crate::fs::{atomic_write, hash_content, hash_file};

/// Ignore file honored at the asset source root
pub const IGNORE_FILE_NAME: &str = ".rolloutignore";

/// Outcome of one collection pass
#[derive(Debug, Clone, Default)]
pub struct CollectResult {
    /// Relative paths written this run
    pub written: Vec<String>,
    /// Relative paths skipped because the destination was identical
    pub unchanged: Vec<String>,
    /// Total bytes written
    pub bytes_written: u64,
}

impl CollectResult {
    pub fn total(&self) -> usize {
        self.written.len() + self.unchanged.len()
    }
}

/// Collect all assets from `source` into `dest`.
///
/// Fails with `AssetCollection` if the source directory is missing or any
/// file cannot be read or written. Partial output from a failed run is left
/// in place (no rollback).
pub fn collect_assets(source: &Path, dest: &Path) -> RolloutResult<CollectResult> {
    if !source.is_dir() {
        return Err(RolloutError::AssetCollection {
            path: source.to_path_buf(),
            message: "source directory not found".to_string(),
        });
    }

    std::fs::create_dir_all(dest).map_err(|e| RolloutError::AssetCollection {
        path: dest.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut result = CollectResult::default();

    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| RolloutError::AssetCollection {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();

        if !path.is_file() || path.file_name().is_some_and(|n| n == IGNORE_FILE_NAME) {
            continue;
        }

        let relative = path
            .strip_prefix(source)
            .map(PathBuf::from)
            .unwrap_or_else(|_| path.to_path_buf());
        let target = dest.join(&relative);
        let relative_display = relative.to_string_lossy().replace('\\', "/");

        let content = std::fs::read(path).map_err(|e| RolloutError::AssetCollection {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if target.exists() {
            if let Ok(existing) = hash_file(&target) {
                if existing == hash_content(&content) {
                    result.unchanged.push(relative_display);
                    continue;
                }
            }
        }

        atomic_write(&target, &content).map_err(|e| RolloutError::AssetCollection {
            path: target.clone(),
            message: e.to_string(),
        })?;
        result.bytes_written += content.len() as u64;
        result.written.push(relative_display);
    }

    Ok(result)
}
