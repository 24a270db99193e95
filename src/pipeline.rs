//! Provisioning pipeline
//!
//! Runs the four steps strictly in order, fail-fast:
//!
//! 1. install dependencies
//! 2. collect static assets
//! 3. apply schema migrations
//! 4. ensure the admin account
//!
//! The first failing step aborts the run; side effects of steps that already
//! committed are left in place (forward-only, no rollback). Progress is
//! reported through a callback so the CLI can render human or JSON output.

use std::fmt;

use thiserror::Error;

use crate::admin::{self, AdminOutcome};
use crate::assets::{collect_assets, CollectResult};
use crate::config::Config;
use crate::error::RolloutError;
use crate::installer::{install_dependencies, InstallResult};
use crate::manifest::Manifest;
use crate::migrate::{apply_migrations, MigrateResult};

/// One step of the pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Dependencies,
    Assets,
    Migrations,
    Admin,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Dependencies, Step::Assets, Step::Migrations, Step::Admin];

    /// Stable identifier used in JSON output
    pub fn id(self) -> &'static str {
        match self {
            Step::Dependencies => "dependencies",
            Step::Assets => "assets",
            Step::Migrations => "migrations",
            Step::Admin => "admin",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Dependencies => "install dependencies",
            Step::Assets => "collect static assets",
            Step::Migrations => "apply migrations",
            Step::Admin => "ensure admin account",
        };
        write!(f, "{label}")
    }
}

/// Pipeline state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    DependenciesInstalled,
    AssetsCollected,
    SchemaMigrated,
    /// Terminal success
    AdminEnsured,
    /// Terminal failure at the given step
    Failed(Step),
}

/// A step failure: which step, and the underlying error
#[derive(Debug, Error)]
#[error("step '{step}' failed: {error}")]
pub struct ProvisionFailure {
    pub step: Step,
    #[source]
    pub error: RolloutError,
}

/// Progress event emitted while the pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionEvent {
    StepStart { step: Step },
    StepDone { step: Step, detail: String },
    StepFailed { step: Step, message: String },
}

/// Options for a provisioning run
#[derive(Debug, Clone, Default)]
pub struct ProvisionOptions {
    /// Allow interactive credential prompts when stdin is a terminal
    pub allow_prompt: bool,
}

/// Outcome of a full provisioning run
#[derive(Debug)]
pub struct ProvisionReport {
    pub state: PipelineState,
    pub install: Option<InstallResult>,
    pub assets: Option<CollectResult>,
    pub migrations: Option<MigrateResult>,
    pub admin: Option<AdminOutcome>,
    pub admin_username: Option<String>,
}

impl ProvisionReport {
    fn pending() -> Self {
        Self {
            state: PipelineState::Pending,
            install: None,
            assets: None,
            migrations: None,
            admin: None,
            admin_username: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::AdminEnsured
    }
}

/// The provisioner: owns the configuration and runs the pipeline
pub struct Provisioner {
    config: Config,
    options: ProvisionOptions,
}

impl Provisioner {
    pub fn new(config: Config, options: ProvisionOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline without progress reporting
    pub fn run(&self) -> Result<ProvisionReport, ProvisionFailure> {
        self.run_with_events(&mut |_| {})
    }

    /// Run the pipeline, emitting a `ProvisionEvent` per step transition.
    ///
    /// On failure callers get the failing step and cause; everything
    /// committed before it stays committed.
    pub fn run_with_events(
        &self,
        on_event: &mut dyn FnMut(ProvisionEvent),
    ) -> Result<ProvisionReport, ProvisionFailure> {
        let mut report = ProvisionReport::pending();

        // Step A - install dependencies
        let install = self.step(Step::Dependencies, on_event, |cfg| {
            let manifest = Manifest::load(&cfg.manifest_path())?;
            install_dependencies(&manifest, &cfg.index_path(), &cfg.env_dir_path())
        })?;
        report.state = PipelineState::DependenciesInstalled;
        report.install = Some(install);

        // Step B - collect static assets
        let assets = self.step(Step::Assets, on_event, |cfg| {
            collect_assets(&cfg.assets_source_path(), &cfg.assets_dest_path())
        })?;
        report.state = PipelineState::AssetsCollected;
        report.assets = Some(assets);

        // Step C - apply migrations
        let migrations = self.step(Step::Migrations, on_event, |cfg| {
            apply_migrations(&cfg.migrations_path(), &cfg.database_dir_path())
        })?;
        report.state = PipelineState::SchemaMigrated;
        report.migrations = Some(migrations);

        // Step D - ensure admin account
        let allow_prompt = self.options.allow_prompt;
        let (outcome, username) = self.step(Step::Admin, on_event, |cfg| {
            let credentials = admin::resolve_credentials(&cfg.admin, allow_prompt)?;
            let outcome = admin::ensure_admin(&cfg.database_dir_path(), &credentials)?;
            Ok((outcome, credentials.username))
        })?;
        report.state = PipelineState::AdminEnsured;
        report.admin = Some(outcome);
        report.admin_username = Some(username);

        Ok(report)
    }

    fn step<T: StepDetail>(
        &self,
        step: Step,
        on_event: &mut dyn FnMut(ProvisionEvent),
        body: impl FnOnce(&Config) -> Result<T, RolloutError>,
    ) -> Result<T, ProvisionFailure> {
        on_event(ProvisionEvent::StepStart { step });
        match body(&self.config) {
            Ok(value) => {
                on_event(ProvisionEvent::StepDone {
                    step,
                    detail: value.detail(),
                });
                Ok(value)
            }
            Err(error) => {
                on_event(ProvisionEvent::StepFailed {
                    step,
                    message: error.to_string(),
                });
                Err(ProvisionFailure { step, error })
            }
        }
    }
}

impl ProvisionFailure {
    /// Terminal state this failure puts the pipeline in
    pub fn state(&self) -> PipelineState {
        PipelineState::Failed(self.step)
    }
}

/// One-line summary of a step's outcome for progress output
trait StepDetail {
    fn detail(&self) -> String;
}

impl StepDetail for InstallResult {
    fn detail(&self) -> String {
        format!(
            "{} installed, {} up to date",
            self.installed.len(),
            self.skipped.len()
        )
    }
}

impl StepDetail for CollectResult {
    fn detail(&self) -> String {
        format!(
            "{} written, {} unchanged",
            self.written.len(),
            self.unchanged.len()
        )
    }
}

impl StepDetail for MigrateResult {
    fn detail(&self) -> String {
        format!(
            "{} applied, {} already applied",
            self.applied.len(),
            self.already_applied
        )
    }
}

impl StepDetail for (AdminOutcome, String) {
    fn detail(&self) -> String {
        match self.0 {
            AdminOutcome::Created => format!("account '{}' created", self.1),
            AdminOutcome::AlreadyExists => format!("account '{}' already exists", self.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn base_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.project.dir = root.to_path_buf();
        config.admin.username = Some("admin".to_string());
        config.admin.email = Some("admin@example.com".to_string());
        config.admin.password = Some("s3cret".to_string());
        config
    }

    fn scaffold(root: &Path) {
        std::fs::write(root.join("requirements.txt"), "").unwrap();
        std::fs::create_dir_all(root.join("static")).unwrap();
        std::fs::create_dir_all(root.join("db")).unwrap();
    }

    fn run(config: Config) -> (Result<ProvisionReport, ProvisionFailure>, Vec<ProvisionEvent>) {
        let provisioner = Provisioner::new(config, ProvisionOptions::default());
        let mut events = Vec::new();
        let result = provisioner.run_with_events(&mut |e| events.push(e));
        (result, events)
    }

    #[test]
    fn test_full_run_reaches_terminal_success() {
        let tmp = tempdir().unwrap();
        scaffold(tmp.path());

        let (result, events) = run(base_config(tmp.path()));

        let report = result.unwrap();
        assert_eq!(report.state, PipelineState::AdminEnsured);
        assert!(report.is_success());
        assert_eq!(report.admin, Some(AdminOutcome::Created));
        // Every step emitted start + done, in order
        let starts: Vec<Step> = events
            .iter()
            .filter_map(|e| match e {
                ProvisionEvent::StepStart { step } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(starts, Step::ALL.to_vec());
    }

    #[test]
    fn test_manifest_failure_stops_before_assets() {
        let tmp = tempdir().unwrap();
        scaffold(tmp.path());
        std::fs::write(tmp.path().join("requirements.txt"), "missing-pkg\n").unwrap();

        let (result, events) = run(base_config(tmp.path()));

        let failure = result.unwrap_err();
        assert_eq!(failure.step, Step::Dependencies);
        // Later steps never started
        assert!(!events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::StepStart { step: Step::Assets })));
        // No assets were collected, no account created
        assert!(!tmp.path().join("staticfiles").exists());
        assert!(!tmp.path().join("db/admins.json").exists());
    }

    #[test]
    fn test_unreachable_database_fails_at_migrations() {
        let tmp = tempdir().unwrap();
        scaffold(tmp.path());
        std::fs::remove_dir_all(tmp.path().join("db")).unwrap();
        std::fs::create_dir_all(tmp.path().join("migrations")).unwrap();
        std::fs::write(
            tmp.path().join("migrations/0001_initial.sql"),
            "CREATE TABLE t (c INT);",
        )
        .unwrap();

        let (result, events) = run(base_config(tmp.path()));

        let failure = result.unwrap_err();
        assert_eq!(failure.step, Step::Migrations);
        assert!(matches!(failure.error, RolloutError::Migration { .. }));
        // Steps A and B completed, D never started
        assert!(events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::StepDone { step: Step::Assets, .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, ProvisionEvent::StepStart { step: Step::Admin })));
    }

    #[test]
    fn test_missing_credentials_fail_at_admin() {
        let tmp = tempdir().unwrap();
        scaffold(tmp.path());
        let mut config = base_config(tmp.path());
        config.admin.password = None;

        let (result, _) = run(config);

        let failure = result.unwrap_err();
        assert_eq!(failure.step, Step::Admin);
        assert!(failure.error.to_string().contains("ROLLOUT_ADMIN_PASSWORD"));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let tmp = tempdir().unwrap();
        scaffold(tmp.path());
        std::fs::create_dir_all(tmp.path().join("static/css")).unwrap();
        std::fs::write(tmp.path().join("static/css/site.css"), "body {}").unwrap();
        std::fs::create_dir_all(tmp.path().join("migrations")).unwrap();
        std::fs::write(
            tmp.path().join("migrations/0001_initial.sql"),
            "CREATE TABLE t (c INT);",
        )
        .unwrap();

        let (first, _) = run(base_config(tmp.path()));
        let first = first.unwrap();
        assert_eq!(first.assets.as_ref().unwrap().written.len(), 1);
        assert_eq!(first.migrations.as_ref().unwrap().applied.len(), 1);
        assert_eq!(first.admin, Some(AdminOutcome::Created));

        let (second, _) = run(base_config(tmp.path()));
        let second = second.unwrap();
        assert!(second.assets.as_ref().unwrap().written.is_empty());
        assert!(second.migrations.as_ref().unwrap().applied.is_empty());
        assert_eq!(second.admin, Some(AdminOutcome::AlreadyExists));
    }

    #[test]
    fn test_failure_display_names_step() {
        let tmp = tempdir().unwrap();
        scaffold(tmp.path());
        std::fs::write(tmp.path().join("requirements.txt"), "nope\n").unwrap();

        let (result, _) = run(base_config(tmp.path()));

        let failure = result.unwrap_err();
        let message = failure.to_string();
        assert!(message.contains("install dependencies"));
        assert!(message.contains("failed"));
    }
}
