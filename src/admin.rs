//! Admin account provisioning (Step D)
//!
//! The account store is a JSON file in the database directory. Ensuring an
//! account is an explicit existence check followed by a conditional create,
//! never a bare create, so re-running provisioning is a safe no-op when the
//! account already exists.
//!
//! Credentials come from config (with `ROLLOUT_ADMIN_*` environment
//! overrides already folded in); missing fields fall back to an interactive
//! prompt when stdin is a terminal and prompting was not disabled.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use dialoguer::{Input, Password};
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};

use crate::config::AdminConfig;
use crate::error::{RolloutError, RolloutResult};
use crate::fs::{atomic_write, hash_content};

/// Account store file name inside the database directory
pub const ADMIN_STORE: &str = "admins.json";

/// Resolved admin credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Outcome of ensuring the admin account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    /// Account did not exist and was created
    Created,
    /// Account already existed; nothing was written
    AlreadyExists,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    email: String,
    password_digest: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdminStore {
    version: u32,
    #[serde(default)]
    accounts: BTreeMap<String, AccountRecord>,
}

impl AdminStore {
    fn load(db_dir: &Path) -> RolloutResult<Self> {
        let path = db_dir.join(ADMIN_STORE);
        if !path.exists() {
            return Ok(Self {
                version: 1,
                accounts: BTreeMap::new(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| RolloutError::AdminAccount {
            message: format!("corrupt account store {}: {e}", path.display()),
        })
    }

    fn save(&self, db_dir: &Path) -> RolloutResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        atomic_write(&db_dir.join(ADMIN_STORE), content.as_bytes())
    }
}

/// Resolve credentials from config, prompting for missing fields.
///
/// Prompting requires stdin to be a terminal and `allow_prompt` to be true;
/// otherwise a missing field is an `AdminAccount` error naming the
/// environment variable that would supply it.
pub fn resolve_credentials(admin: &AdminConfig, allow_prompt: bool) -> RolloutResult<Credentials> {
    let interactive = allow_prompt && std::io::stdin().is_terminal();

    let username = match &admin.username {
        Some(u) => u.clone(),
        None if interactive => prompt_text("Admin username")?,
        None => return Err(missing("username", "ROLLOUT_ADMIN_USERNAME")),
    };

    let email = match &admin.email {
        Some(e) => e.clone(),
        None if interactive => prompt_text("Admin email")?,
        None => return Err(missing("email", "ROLLOUT_ADMIN_EMAIL")),
    };

    let password = match &admin.password {
        Some(p) => p.clone(),
        None if interactive => Password::new()
            .with_prompt("Admin password")
            .with_confirmation("Confirm password", "passwords do not match")
            .interact()
            .map_err(|e| RolloutError::AdminAccount {
                message: format!("prompt failed: {e}"),
            })?,
        None => return Err(missing("password", "ROLLOUT_ADMIN_PASSWORD")),
    };

    validate(&username, &email, &password)?;

    Ok(Credentials {
        username,
        email,
        password,
    })
}

/// Ensure the admin account exists, idempotently.
///
/// Re-running with the same username succeeds as a no-op even if the other
/// fields differ; the existing record is never overwritten.
pub fn ensure_admin(db_dir: &Path, credentials: &Credentials) -> RolloutResult<AdminOutcome> {
    if !db_dir.is_dir() {
        return Err(RolloutError::AdminAccount {
            message: format!("database directory not found: {}", db_dir.display()),
        });
    }

    validate(&credentials.username, &credentials.email, &credentials.password)?;

    let mut store = AdminStore::load(db_dir)?;
    if store.accounts.contains_key(&credentials.username) {
        return Ok(AdminOutcome::AlreadyExists);
    }

    store.accounts.insert(
        credentials.username.clone(),
        AccountRecord {
            email: credentials.email.clone(),
            password_digest: hash_content(credentials.password.as_bytes()),
            created_at: Utc::now(),
        },
    );
    store.save(db_dir)?;

    Ok(AdminOutcome::Created)
}

/// Check whether an admin account with this username exists (used by `status`)
pub fn admin_exists(db_dir: &Path, username: &str) -> RolloutResult<bool> {
    if !db_dir.is_dir() {
        return Ok(false);
    }
    let store = AdminStore::load(db_dir)?;
    Ok(store.accounts.contains_key(username))
}

/// Number of accounts in the store
pub fn admin_count(db_dir: &Path) -> RolloutResult<usize> {
    if !db_dir.is_dir() {
        return Ok(0);
    }
    let store = AdminStore::load(db_dir)?;
    Ok(store.accounts.len())
}

fn prompt_text(prompt: &str) -> RolloutResult<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| RolloutError::AdminAccount {
            message: format!("prompt failed: {e}"),
        })
}

fn missing(field: &str, env_var: &str) -> RolloutError {
    RolloutError::AdminAccount {
        message: format!("missing {field}: set {env_var} or add it to rollout.toml"),
    }
}

fn validate(username: &str, email: &str, password: &str) -> RolloutResult<()> {
    if username.trim().is_empty() {
        return Err(RolloutError::AdminAccount {
            message: "username must not be empty".to_string(),
        });
    }
    if !email.contains('@') {
        return Err(RolloutError::AdminAccount {
            message: format!("invalid email address '{email}'"),
        });
    }
    if password.is_empty() {
        return Err(RolloutError::AdminAccount {
            message: "password must not be empty".to_string(),
        });
    }
    Ok(())
}
