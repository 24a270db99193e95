//! Error types for Rollout
//!
//! Uses `thiserror` for library errors. The binary converts these into
//! `anyhow` at the CLI boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Rollout operations
pub type RolloutResult<T> = Result<T, RolloutError>;

/// Main error type for Rollout operations
#[derive(Error, Debug)]
pub enum RolloutError {
    /// A requirement could not be resolved or installed (Step A)
    #[error("failed to install '{package}': {reason}")]
    DependencyInstall { package: String, reason: String },

    /// Static asset collection failed (Step B)
    #[error("asset collection failed for {path}: {message}")]
    AssetCollection { path: PathBuf, message: String },

    /// Schema migration failed (Step C): a bad migration file, a ledger
    /// conflict, or an unreachable database directory
    #[error("migration failed: {message}")]
    Migration { message: String },

    /// Admin account could not be ensured (Step D)
    #[error("admin account error: {message}")]
    AdminAccount { message: String },

    /// Malformed line in the dependency manifest
    #[error("invalid requirement in {file}:{line}: {message}")]
    ManifestParse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// Invalid configuration TOML
    #[error("invalid configuration in {file}: {message}")]
    InvalidConfig { file: PathBuf, message: String },

    /// Directory not found
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
