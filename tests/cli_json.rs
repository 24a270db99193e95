//! JSON output mode: one event object per line.

mod common;

use common::{scaffold_minimal, TestEnv, ADMIN_ENV};

fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad JSON line '{l}': {e}")))
        .collect()
}

#[test]
fn test_json_run_emits_step_events_and_summary() {
    let env = TestEnv::new();
    scaffold_minimal(&env);

    let result = env.run_with_env(&["run", "--json"], ADMIN_ENV);

    assert!(result.success, "run failed:\n{}", result.combined_output());
    let events = json_lines(&result.stdout);

    let starts: Vec<&str> = events
        .iter()
        .filter(|e| e["event"] == "step_start")
        .map(|e| e["step"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["dependencies", "assets", "migrations", "admin"]);

    let summary = events.last().unwrap();
    assert_eq!(summary["event"], "run");
    assert_eq!(summary["status"], "success");
    assert_eq!(summary["admin"], "admin");
}

#[test]
fn test_json_failure_names_step_and_error() {
    let env = TestEnv::new();
    scaffold_minimal(&env);
    env.write("requirements.txt", "missing-pkg\n");
    env.mkdir("pkg-index");

    let result = env.run_with_env(&["run", "--json"], ADMIN_ENV);

    assert!(!result.success);
    let events = json_lines(&result.stdout);

    let failed = events
        .iter()
        .find(|e| e["event"] == "step_failed")
        .expect("step_failed event");
    assert_eq!(failed["step"], "dependencies");

    let summary = events.last().unwrap();
    assert_eq!(summary["event"], "run");
    assert_eq!(summary["status"], "failed");
    assert_eq!(summary["step"], "dependencies");
}

#[test]
fn test_json_status_shape() {
    let env = TestEnv::new();
    scaffold_minimal(&env);
    env.write("requirements.txt", "flask\n");

    let result = env.run_with_env(&["status", "--json"], ADMIN_ENV);

    assert!(result.success, "status failed:\n{}", result.combined_output());
    let events = json_lines(&result.stdout);
    let status = events.last().unwrap();
    assert_eq!(status["event"], "status");
    assert_eq!(status["requirements"], 1);
    assert_eq!(status["admin_exists"], false);
}
