//! Shared test helpers for integration tests

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;

/// Helper to get an fbt command
pub fn fbt() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("fbt"));
    // Keep host configuration out of the tests.
    cmd.env_remove("FBT_CONFIG")
        .env_remove("FBT_OKAPI_URL")
        .env_remove("FBT_TENANT")
        .env_remove("FBT_TOKEN")
        .env_remove("FBT_BACKUP_DIR")
        .env_remove("RUST_LOG");
    cmd
}

/// An fbt command with connection settings pointing at a placeholder
/// host. Commands under test must fail or finish before touching the
/// network for this to be safe.
pub fn fbt_configured() -> Command {
    let mut cmd = fbt();
    cmd.env("FBT_OKAPI_URL", "https://folio.example.edu")
        .env("FBT_TENANT", "testlib")
        .env("FBT_TOKEN", "test-token");
    cmd
}
