//! Dependency installer (Step A)
//!
//! Resolves each manifest requirement against a local package index and
//! installs the resolved package tree into the environment directory.
//!
//! Index layout: `<index>/<name>/<version>/` holds the package's files.
//! Resolution picks the highest indexed version satisfying the constraint.
//!
//! Installed packages are recorded in `installed.json` inside the
//! environment directory so a re-run skips packages whose installed version
//! still satisfies the manifest.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RolloutError, RolloutResult};
use crate::fs::atomic_write;
use crate::manifest::{Manifest, Requirement, Version};

/// Install ledger file name inside the environment directory
pub const INSTALL_LEDGER: &str = "installed.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstalledPackage {
    version: String,
    installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InstallLedger {
    version: u32,
    #[serde(default)]
    packages: BTreeMap<String, InstalledPackage>,
}

impl InstallLedger {
    fn load(env_dir: &Path) -> Self {
        let path = env_dir.join(INSTALL_LEDGER);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self {
                version: 1,
                packages: BTreeMap::new(),
            };
        };
        serde_json::from_str(&content).unwrap_or_else(|_| Self {
            version: 1,
            packages: BTreeMap::new(),
        })
    }

    fn save(&self, env_dir: &Path) -> RolloutResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        atomic_write(&env_dir.join(INSTALL_LEDGER), content.as_bytes())
    }
}

/// Outcome of installing one manifest
#[derive(Debug, Clone, Default)]
pub struct InstallResult {
    /// Packages installed this run, `(name, version)`
    pub installed: Vec<(String, String)>,
    /// Packages whose installed version already satisfied the manifest
    pub skipped: Vec<String>,
}

/// Install every requirement in the manifest, fail-fast.
///
/// The first unresolvable requirement aborts with `DependencyInstall`;
/// packages resolved before it stay installed (no rollback).
pub fn install_dependencies(
    manifest: &Manifest,
    index_dir: &Path,
    env_dir: &Path,
) -> RolloutResult<InstallResult> {
    if !manifest.is_empty() && !index_dir.is_dir() {
        return Err(RolloutError::DirectoryNotFound {
            path: index_dir.to_path_buf(),
        });
    }

    std::fs::create_dir_all(env_dir)?;
    let mut ledger = InstallLedger::load(env_dir);
    let mut result = InstallResult::default();

    for requirement in &manifest.requirements {
        // Skip when the installed version still satisfies the constraint
        if let Some(installed) = ledger.packages.get(&requirement.name) {
            if let Ok(installed_version) = Version::from_str(&installed.version) {
                if requirement.constraint.matches(&installed_version)
                    && env_dir.join(&requirement.name).is_dir()
                {
                    result.skipped.push(requirement.name.clone());
                    continue;
                }
            }
        }

        let version = resolve(requirement, index_dir)?;
        let source = index_dir.join(&requirement.name).join(version.to_string());
        let dest = env_dir.join(&requirement.name);

        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        copy_tree(&source, &dest).map_err(|e| RolloutError::DependencyInstall {
            package: requirement.name.clone(),
            reason: e.to_string(),
        })?;

        ledger.packages.insert(
            requirement.name.clone(),
            InstalledPackage {
                version: version.to_string(),
                installed_at: Utc::now(),
            },
        );
        ledger.save(env_dir)?;
        result
            .installed
            .push((requirement.name.clone(), version.to_string()));
    }

    Ok(result)
}

/// Resolve a requirement to the highest indexed version satisfying it
fn resolve(requirement: &Requirement, index_dir: &Path) -> RolloutResult<Version> {
    let package_dir = index_dir.join(&requirement.name);
    if !package_dir.is_dir() {
        return Err(RolloutError::DependencyInstall {
            package: requirement.name.clone(),
            reason: "not found in package index".to_string(),
        });
    }

    let mut available: Vec<Version> = Vec::new();
    for entry in std::fs::read_dir(&package_dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if let Ok(version) = Version::from_str(name) {
                available.push(version);
            }
        }
    }
    available.sort();

    available
        .into_iter()
        .rev()
        .find(|v| requirement.constraint.matches(v))
        .ok_or_else(|| RolloutError::DependencyInstall {
            package: requirement.name.clone(),
            reason: format!("no indexed version satisfies '{}'", requirement),
        })
}

fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
