//! Dependency manifest parser
//!
//! The manifest lists one requirement per line:
//!
//! ```text
//! # comment
//! flask
//! requests==2.31.0
//! gunicorn>=21.2
//! ```
//!
//! Supported constraints are `==` (exact) and `>=` (minimum) over dotted
//! numeric versions. Anything else is a parse error with the offending line
//! number.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{RolloutError, RolloutResult};

/// A dotted numeric package version (`1`, `2.31`, `21.2.0`).
///
/// Ordering is componentwise with missing components treated as zero, so
/// `2.31` == `2.31.0` and `2.4` < `2.31`.
#[derive(Debug, Clone)]
pub struct Version(Vec<u32>);

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Version {
    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty version".to_string());
        }
        let mut components = Vec::new();
        for part in s.split('.') {
            let n: u32 = part
                .parse()
                .map_err(|_| format!("invalid version component '{part}'"))?;
            components.push(n);
        }
        Ok(Version(components))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Version constraint on a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// No constraint - any available version satisfies
    Any,
    /// Exactly this version
    Exact(Version),
    /// This version or newer
    AtLeast(Version),
}

impl Constraint {
    /// Check whether a candidate version satisfies this constraint
    pub fn matches(&self, candidate: &Version) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Exact(v) => candidate == v,
            Constraint::AtLeast(v) => candidate >= v,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => Ok(()),
            Constraint::Exact(v) => write!(f, "=={v}"),
            Constraint::AtLeast(v) => write!(f, ">={v}"),
        }
    }
}

/// A single declared dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub constraint: Constraint,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.constraint)
    }
}

/// Parsed dependency manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub requirements: Vec<Requirement>,
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> RolloutResult<Self> {
        let content = std::fs::read_to_string(path)?;
        parse_manifest(&content, path)
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }
}

/// Check whether a string is a valid package name.
///
/// Names are ASCII alphanumerics plus `.`, `_` and `-`, and must start and
/// end with an alphanumeric character.
pub fn is_valid_package_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return false;
    }
    bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Parse manifest content, reporting errors with 1-indexed line numbers
pub fn parse_manifest(content: &str, file: &Path) -> RolloutResult<Manifest> {
    let mut requirements = Vec::new();

    for (i, raw_line) in content.lines().enumerate() {
        let line_no = i + 1;

        // Strip trailing comments, then whitespace
        let line = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        requirements.push(parse_requirement(line, file, line_no)?);
    }

    Ok(Manifest { requirements })
}

fn parse_requirement(line: &str, file: &Path, line_no: usize) -> RolloutResult<Requirement> {
    let parse_err = |message: String| RolloutError::ManifestParse {
        file: file.to_path_buf(),
        line: line_no,
        message,
    };

    let (name, constraint) = if let Some((name, version)) = line.split_once("==") {
        let version = Version::from_str(version.trim()).map_err(&parse_err)?;
        (name.trim(), Constraint::Exact(version))
    } else if let Some((name, version)) = line.split_once(">=") {
        let version = Version::from_str(version.trim()).map_err(&parse_err)?;
        (name.trim(), Constraint::AtLeast(version))
    } else if let Some(pos) = line.find(['<', '>', '=', '~', '!', '^']) {
        let op: String = line[pos..].chars().take(2).collect();
        return Err(parse_err(format!("unsupported operator '{}'", op.trim())));
    } else {
        (line, Constraint::Any)
    };

    if !is_valid_package_name(name) {
        return Err(parse_err(format!("invalid package name '{name}'")));
    }

    Ok(Requirement {
        name: name.to_string(),
        constraint,
    })
}
