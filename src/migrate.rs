//! Schema migration runner (Step C)
//!
//! Migrations are ordered SQL files named `NNNN_label.sql` in the migrations
//! directory. Applied state lives in a `schema.json` ledger inside the
//! database directory, guarded by an exclusive advisory lock while a run is
//! in progress.
//!
//! Each migration is applied at most once. The ledger is rewritten
//! atomically after every migration, so a failure mid-run keeps everything
//! already applied. There is no rollback; the pipeline is forward-only.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{RolloutError, RolloutResult};
use crate::fs::{atomic_write, hash_content};

/// Ledger file name inside the database directory
pub const SCHEMA_LEDGER: &str = "schema.json";

const LEDGER_VERSION: u32 = 1;

/// One migration file on disk, discovered and ordered by numeric prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Numeric prefix (`2` for `0002_add_index.sql`)
    pub number: u32,
    /// File stem (`0002_add_index`)
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppliedMigration {
    name: String,
    checksum: String,
    applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaLedger {
    version: u32,
    #[serde(default)]
    migrations: Vec<AppliedMigration>,
}

impl SchemaLedger {
    fn empty() -> Self {
        Self {
            version: LEDGER_VERSION,
            migrations: Vec::new(),
        }
    }

    fn load(db_dir: &Path) -> RolloutResult<Self> {
        let path = db_dir.join(SCHEMA_LEDGER);
        if !path.exists() {
            return Ok(Self::empty());
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| RolloutError::Migration {
            message: format!("corrupt schema ledger {}: {e}", path.display()),
        })
    }

    fn save(&self, db_dir: &Path) -> RolloutResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        atomic_write(&db_dir.join(SCHEMA_LEDGER), content.as_bytes())
    }
}

/// Outcome of one migration run
#[derive(Debug, Clone, Default)]
pub struct MigrateResult {
    /// Migration names applied this run, in order
    pub applied: Vec<String>,
    /// Migrations that were already recorded in the ledger
    pub already_applied: usize,
}

/// Pending/applied breakdown without mutating anything (used by `status`)
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
}

/// Discover migration files and order them by numeric prefix.
///
/// Rejects files that don't match `NNNN_label.sql`, duplicate numbers, and
/// gaps in the sequence (migrations must be contiguous from 1).
pub fn discover_migrations(migrations_dir: &Path) -> RolloutResult<Vec<MigrationFile>> {
    if !migrations_dir.is_dir() {
        // No migrations directory means zero pending migrations
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(migrations_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let number = stem
            .split_once('_')
            .and_then(|(prefix, _)| prefix.parse::<u32>().ok())
            .ok_or_else(|| RolloutError::Migration {
                message: format!("'{stem}': file name must match 'NNNN_label.sql'"),
            })?;

        files.push(MigrationFile { number, name: stem, path });
    }

    files.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.name.cmp(&b.name)));

    for (i, file) in files.iter().enumerate() {
        let expected = (i + 1) as u32;
        if file.number != expected {
            let detail = if i > 0 && files[i - 1].number == file.number {
                format!("duplicate migration number {:04}", file.number)
            } else {
                format!("sequence gap: expected {:04}, found {:04}", expected, file.number)
            };
            return Err(RolloutError::Migration {
                message: format!("'{}': {detail}", file.name),
            });
        }
    }

    Ok(files)
}

/// Apply all unapplied migrations in order, fail-fast.
///
/// The database directory must already exist; a missing directory is
/// reported as the database being unreachable, not created silently.
pub fn apply_migrations(migrations_dir: &Path, db_dir: &Path) -> RolloutResult<MigrateResult> {
    if !db_dir.is_dir() {
        return Err(RolloutError::Migration {
            message: format!("database unreachable: {} does not exist", db_dir.display()),
        });
    }

    let _lock = acquire_lock(db_dir)?;

    let files = discover_migrations(migrations_dir)?;
    let mut ledger = SchemaLedger::load(db_dir)?;
    let mut result = MigrateResult::default();

    for (i, file) in files.iter().enumerate() {
        let content = std::fs::read_to_string(&file.path)?;
        let checksum = hash_content(content.as_bytes());

        if let Some(applied) = ledger.migrations.get(i) {
            if applied.name != file.name {
                return Err(RolloutError::Migration {
                    message: format!(
                        "'{}' conflicts with applied migration '{}' at position {}",
                        file.name,
                        applied.name,
                        i + 1
                    ),
                });
            }
            if applied.checksum != checksum {
                return Err(RolloutError::Migration {
                    message: format!("'{}': checksum mismatch with applied version", file.name),
                });
            }
            result.already_applied += 1;
            continue;
        }

        validate_sql(file, &content)?;

        ledger.migrations.push(AppliedMigration {
            name: file.name.clone(),
            checksum,
            applied_at: Utc::now(),
        });
        // Persist after every migration: per-migration durability
        ledger.save(db_dir)?;
        result.applied.push(file.name.clone());
    }

    Ok(result)
}

/// Compute applied/pending state without taking the lock or mutating
pub fn migration_status(migrations_dir: &Path, db_dir: &Path) -> RolloutResult<MigrationStatus> {
    let files = discover_migrations(migrations_dir)?;
    let ledger = if db_dir.is_dir() {
        SchemaLedger::load(db_dir)?
    } else {
        SchemaLedger::empty()
    };

    let applied: Vec<String> = ledger.migrations.iter().map(|m| m.name.clone()).collect();
    let pending = files
        .into_iter()
        .map(|f| f.name)
        .filter(|name| !applied.contains(name))
        .collect();

    Ok(MigrationStatus { applied, pending })
}

fn acquire_lock(db_dir: &Path) -> RolloutResult<std::fs::File> {
    let lock_path = db_dir.join("schema.lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    file.lock_exclusive().map_err(|e| RolloutError::Migration {
        message: format!("could not lock {}: {e}", lock_path.display()),
    })?;
    Ok(file)
}

/// Reject migrations with no executable content.
fn validate_sql(file: &MigrationFile, content: &str) -> RolloutResult<()> {
    let has_statement = content
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("--"));

    if !has_statement {
        return Err(RolloutError::Migration {
            message: format!("'{}': migration file contains no statements", file.name),
        });
    }
    Ok(())
}
