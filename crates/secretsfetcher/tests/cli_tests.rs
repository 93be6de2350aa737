//! Binary tests that stop before any AWS call

// Integration tests can use unwrap/expect for cleaner assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn secretsfetcher(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("secretsfetcher").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("SECRETSFETCHER_CONFIG")
        .env_remove("SECRETSFETCHER_PREFIX")
        .env_remove("SECRETSFETCHER_MANIFEST")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    secretsfetcher(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("secretsfetcher Version: "));
}

#[test]
fn test_fetch_without_prefix_fails() {
    let dir = TempDir::new().unwrap();
    secretsfetcher(&dir)
        .args(["fetch", "--prefix", "   "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("secret name prefix cannot be empty"));
}

#[test]
fn test_invalid_manifest_provider_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("manifest.yaml"),
        "Provider: azure\nSecretObjects:\n  - ObjectName: app/db\n",
    )
    .unwrap();

    secretsfetcher(&dir)
        .args(["aws", "-m", "manifest.yaml", "-o", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("azure"));
}

#[test]
fn test_invalid_config_log_level_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.yaml"), "LogLevel: chatty\n").unwrap();

    secretsfetcher(&dir)
        .arg("version")
        .env_remove("SECRETSFETCHER_LOG_LEVEL")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("chatty"));
}

#[test]
fn test_config_prefix_is_validated() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("settings.json"),
        r#"{"Aws": {"PrefixFilter": "", "TagKeyFilters": ["team"]}}"#,
    )
    .unwrap();

    secretsfetcher(&dir)
        .args(["--config", "settings.json", "fetch"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("prefix"));
}
