//! Rollout - fail-fast provisioning pipeline
//!
//! Rollout provisions a web application deployment in four strictly ordered
//! steps: install declared dependencies, collect static assets into the
//! serving directory, apply pending schema migrations, and ensure an
//! administrative account exists. The first failure aborts the run; steps
//! that already committed are left in place.

pub mod admin;
pub mod assets;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod installer;
pub mod manifest;
pub mod migrate;
pub mod pipeline;

// Re-exports for convenience
pub use admin::{ensure_admin, resolve_credentials, AdminOutcome, Credentials};
pub use assets::{collect_assets, CollectResult};
pub use config::Config;
pub use error::{RolloutError, RolloutResult};
pub use installer::{install_dependencies, InstallResult};
pub use manifest::{parse_manifest, Constraint, Manifest, Requirement, Version};
pub use migrate::{apply_migrations, migration_status, MigrateResult, MigrationStatus};
pub use pipeline::{
    PipelineState, ProvisionEvent, ProvisionFailure, ProvisionOptions, ProvisionReport,
    Provisioner, Step,
};
