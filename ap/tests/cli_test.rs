//! Tests for the `ap` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// `ap` with config and log locations pointed into `temp`
fn ap(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ap").unwrap();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env("XDG_CONFIG_HOME", temp.path().join("config"));
    cmd
}

#[test]
fn test_help_lists_options() {
    let temp = TempDir::new().unwrap();
    ap(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("<PROMPT>"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("Default script interpreter"))
        .stdout(predicate::str::contains("Logs are written to:"));
}

#[test]
fn test_missing_prompt_is_usage_error() {
    let temp = TempDir::new().unwrap();
    ap(&temp).assert().failure().stderr(predicate::str::contains("PROMPT"));
}

#[test]
fn test_missing_api_key_fails_fast() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("agentpen.yml");
    fs::write(&config, "llm:\n  api-key-env: AGENTPEN_TEST_UNSET_KEY\n").unwrap();

    ap(&temp)
        .env_remove("AGENTPEN_TEST_UNSET_KEY")
        .args(["--config", config.to_str().unwrap(), "list the files"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AGENTPEN_TEST_UNSET_KEY"));
}

#[test]
fn test_unreadable_config_is_reported() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("broken.yml");
    fs::write(&config, "sandbox: [not, a, map").unwrap();

    ap(&temp)
        .args(["--config", config.to_str().unwrap(), "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
