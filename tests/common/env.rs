//! Test environment builder for isolated Rollout testing.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Result of running a rollout CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated project directory plus helpers to run the rollout binary.
///
/// `ROLLOUT_*` variables are scrubbed from the child environment so tests
/// never inherit credentials from the host, and `HOME`/`XDG_CONFIG_HOME`
/// point at a throwaway directory so a real user config can't leak in.
pub struct TestEnv {
    pub project_root: TempDir,
    home_dir: TempDir,
    rollout_bin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            project_root: TempDir::new().expect("create temp project"),
            home_dir: TempDir::new().expect("create temp home"),
            rollout_bin: PathBuf::from(env!("CARGO_BIN_EXE_rollout")),
        }
    }

    /// Get path relative to the project root
    pub fn path(&self, relative: &str) -> PathBuf {
        self.project_root.path().join(relative)
    }

    /// Run rollout from the project root
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    /// Run rollout from the project root with extra env vars
    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(&self.rollout_bin);
        cmd.current_dir(self.project_root.path())
            .args(args)
            .env("HOME", self.home_dir.path())
            .env("XDG_CONFIG_HOME", self.home_dir.path().join(".config"))
            .env_remove("ROLLOUT_ADMIN_USERNAME")
            .env_remove("ROLLOUT_ADMIN_EMAIL")
            .env_remove("ROLLOUT_ADMIN_PASSWORD")
            .env_remove("ROLLOUT_MANIFEST");

        for (key, value) in env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("failed to execute rollout");
        output_to_result(output)
    }

    /// Write a file under the project root, creating parent directories
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Create a directory under the project root
    pub fn mkdir(&self, relative: &str) {
        std::fs::create_dir_all(self.path(relative)).unwrap();
    }

    /// Add a package version to the local index
    pub fn index_package(&self, name: &str, version: &str, files: &[(&str, &str)]) {
        for (file, content) in files {
            self.write(&format!("pkg-index/{name}/{version}/{file}"), content);
        }
        if files.is_empty() {
            self.mkdir(&format!("pkg-index/{name}/{version}"));
        }
    }

    /// Read the account store, if present
    pub fn read_admin_store(&self) -> Option<String> {
        std::fs::read_to_string(self.path("db/admins.json")).ok()
    }

    /// Write the per-user config inside the isolated fake home
    pub fn write_user_config(&self, content: &str) {
        let path = self
            .home_dir
            .path()
            .join(".config")
            .join("rollout")
            .join("config.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn output_to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Scaffold the minimal layout a successful run needs: empty manifest,
/// empty asset source, database directory, no migrations.
pub fn scaffold_minimal(env: &TestEnv) {
    env.write("requirements.txt", "");
    env.mkdir("static");
    env.mkdir("db");
}

/// Assert helper for paths under the project root
pub fn assert_absent(env: &TestEnv, relative: &str) {
    assert!(
        !env.path(relative).exists(),
        "expected {relative} to be absent"
    );
}
