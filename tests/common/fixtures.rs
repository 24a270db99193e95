//! Reusable fixture constants for integration tests.

/// Credentials passed via environment for non-interactive runs
pub const ADMIN_ENV: &[(&str, &str)] = &[
    ("ROLLOUT_ADMIN_USERNAME", "admin"),
    ("ROLLOUT_ADMIN_EMAIL", "admin@example.com"),
    ("ROLLOUT_ADMIN_PASSWORD", "s3cret"),
];

pub const INITIAL_MIGRATION: &str = "CREATE TABLE accounts (id INTEGER PRIMARY KEY);\n";

pub const SECOND_MIGRATION: &str = "CREATE INDEX idx_accounts ON accounts (id);\n";
