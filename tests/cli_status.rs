//! `rollout status` reports without mutating.

mod common;

use common::{scaffold_minimal, TestEnv, ADMIN_ENV, INITIAL_MIGRATION, SECOND_MIGRATION};

#[test]
fn test_status_on_fresh_project() {
    let env = TestEnv::new();
    scaffold_minimal(&env);

    let result = env.run(&["status"]);

    assert!(result.success, "status failed:\n{}", result.combined_output());
    assert!(result.stdout.contains("Requirements: 0"));
    assert!(result.stdout.contains("0 applied, 0 pending"));
    assert!(result.stdout.contains("Admin account: absent"));
}

#[test]
fn test_status_shows_pending_migrations() {
    let env = TestEnv::new();
    scaffold_minimal(&env);
    env.write("migrations/0001_initial.sql", INITIAL_MIGRATION);
    env.write("migrations/0002_add_index.sql", SECOND_MIGRATION);

    let result = env.run(&["status"]);

    assert!(result.success);
    assert!(result.stdout.contains("0 applied, 2 pending"));
    assert!(result.stdout.contains("0001_initial"));
    assert!(result.stdout.contains("0002_add_index"));
}

#[test]
fn test_status_after_successful_run() {
    let env = TestEnv::new();
    scaffold_minimal(&env);
    env.write("migrations/0001_initial.sql", INITIAL_MIGRATION);

    let run = env.run_with_env(&["run"], ADMIN_ENV);
    assert!(run.success, "run failed:\n{}", run.combined_output());

    let result = env.run_with_env(&["status"], ADMIN_ENV);

    assert!(result.success);
    assert!(result.stdout.contains("1 applied, 0 pending"));
    assert!(result.stdout.contains("Admin account: present"));
}

#[test]
fn test_status_does_not_mutate() {
    let env = TestEnv::new();
    scaffold_minimal(&env);
    env.write("migrations/0001_initial.sql", INITIAL_MIGRATION);

    let result = env.run(&["status"]);

    assert!(result.success);
    assert!(!env.path("db/schema.json").exists());
    assert!(!env.path("staticfiles").exists());
    assert!(env.read_admin_store().is_none());
}

#[test]
fn test_status_reports_invalid_manifest() {
    let env = TestEnv::new();
    scaffold_minimal(&env);
    env.write("requirements.txt", "bad name\n");

    let result = env.run(&["status"]);

    assert!(result.success);
    assert!(result.stdout.contains("manifest missing or invalid"));
}
