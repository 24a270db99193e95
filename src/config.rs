//! Configuration module for Rollout
//!
//! Implements the configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (ROLLOUT_*)
//! 3. Project config (rollout.toml in the project directory)
//! 4. Built-in defaults (lowest priority)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RolloutError, RolloutResult};

/// Config file name looked up in the project directory
pub const CONFIG_FILE_NAME: &str = "rollout.toml";

/// Project section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Working directory; all relative paths below resolve against it
    #[serde(default = "default_project_dir")]
    pub dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dir: default_project_dir(),
        }
    }
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Dependency installation section (Step A)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependenciesConfig {
    /// Requirement manifest, one package per line
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Local package index directory (`<index>/<name>/<version>/...`)
    #[serde(default = "default_index")]
    pub index: PathBuf,

    /// Directory packages are installed into
    #[serde(default = "default_env_dir")]
    pub env_dir: PathBuf,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            index: default_index(),
            env_dir: default_env_dir(),
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("requirements.txt")
}

fn default_index() -> PathBuf {
    PathBuf::from("pkg-index")
}

fn default_env_dir() -> PathBuf {
    PathBuf::from("env")
}

/// Static asset section (Step B)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_assets_source")]
    pub source: PathBuf,

    #[serde(default = "default_assets_dest")]
    pub dest: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            source: default_assets_source(),
            dest: default_assets_dest(),
        }
    }
}

fn default_assets_source() -> PathBuf {
    PathBuf::from("static")
}

fn default_assets_dest() -> PathBuf {
    PathBuf::from("staticfiles")
}

/// Database section (Steps C and D)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database directory holding the schema ledger and account store
    #[serde(default = "default_database_dir")]
    pub dir: PathBuf,

    /// Directory of ordered `NNNN_label.sql` migration files
    #[serde(default = "default_migrations")]
    pub migrations: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dir: default_database_dir(),
            migrations: default_migrations(),
        }
    }
}

fn default_database_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_migrations() -> PathBuf {
    PathBuf::from("migrations")
}

/// Admin account section (Step D)
///
/// All fields optional: environment variables override, and the CLI falls
/// back to an interactive prompt when stdin is a terminal.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub dependencies: DependenciesConfig,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> RolloutResult<Self> {
        let (config, _warnings) = Self::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> RolloutResult<(Self, Vec<ConfigWarning>)> {
        let content = fs::read_to_string(path)?;

        let mut unknown_paths: Vec<String> = Vec::new();
        let deserializer = toml::de::Deserializer::new(&content);

        let config: Self = serde_ignored::deserialize(deserializer, |path| {
            unknown_paths.push(path.to_string());
        })
        .map_err(|e| RolloutError::InvalidConfig {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let warnings = unknown_paths
            .into_iter()
            .map(|path_str| {
                let key = path_str
                    .split('.')
                    .next_back()
                    .unwrap_or(path_str.as_str())
                    .to_string();
                ConfigWarning {
                    key: key.clone(),
                    file: path.to_path_buf(),
                    line: find_line_number(&content, &key),
                    suggestion: suggest_key(&key),
                }
            })
            .collect();

        Ok((config, warnings))
    }

    /// Apply environment variable overrides (ROLLOUT_* prefix)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(username) = std::env::var("ROLLOUT_ADMIN_USERNAME") {
            if !username.is_empty() {
                self.admin.username = Some(username);
            }
        }

        if let Ok(email) = std::env::var("ROLLOUT_ADMIN_EMAIL") {
            if !email.is_empty() {
                self.admin.email = Some(email);
            }
        }

        if let Ok(password) = std::env::var("ROLLOUT_ADMIN_PASSWORD") {
            if !password.is_empty() {
                self.admin.password = Some(password);
            }
        }

        if let Ok(manifest) = std::env::var("ROLLOUT_MANIFEST") {
            if !manifest.is_empty() {
                self.dependencies.manifest = PathBuf::from(manifest);
            }
        }

        self
    }

    /// Resolve a configured path against the project directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project.dir.join(path)
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.dependencies.manifest)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.dependencies.index)
    }

    pub fn env_dir_path(&self) -> PathBuf {
        self.resolve(&self.dependencies.env_dir)
    }

    pub fn assets_source_path(&self) -> PathBuf {
        self.resolve(&self.assets.source)
    }

    pub fn assets_dest_path(&self) -> PathBuf {
        self.resolve(&self.assets.dest)
    }

    pub fn database_dir_path(&self) -> PathBuf {
        self.resolve(&self.database.dir)
    }

    pub fn migrations_path(&self) -> PathBuf {
        self.resolve(&self.database.migrations)
    }
}

/// Per-user config file, consulted when the project has none.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rollout").join("config.toml"))
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "project",
        "dir",
        "dependencies",
        "manifest",
        "index",
        "env_dir",
        "assets",
        "source",
        "dest",
        "database",
        "migrations",
        "admin",
        "username",
        "email",
        "password",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
