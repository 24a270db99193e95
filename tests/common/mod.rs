//! Common test utilities for Rollout integration tests.
//!
//! Provides `TestEnv`, an isolated project directory with helpers to
//! scaffold manifests, package indexes, assets and migrations, and to run
//! the rollout binary against it.

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod env;
pub mod fixtures;

#[allow(unused_imports)]
pub use env::*;
#[allow(unused_imports)]
pub use fixtures::*;
