//! CLI end-to-end tests
//!
//! Tests for the vidrelay command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the vidrelay binary
#[allow(deprecated)]
fn vidrelay_cmd() -> Command {
    let mut cmd = Command::cargo_bin("vidrelay").unwrap();
    cmd.env_remove("PORT").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    vidrelay_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    vidrelay_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vidrelay"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("check-tools"));
}

#[test]
fn test_cli_version_command() {
    vidrelay_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "vidrelay {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_serve_help_shows_defaults() {
    vidrelay_cmd()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8000"))
        .stdout(predicate::str::contains("--directory"));
}

#[test]
fn test_cli_validate_defaults() {
    vidrelay_cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("0.0.0.0:3000"));
}

#[test]
fn test_cli_validate_good_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"server": {"port": 4100}, "conversion": {"profile": "remux"}}"#,
    )
    .unwrap();

    vidrelay_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains(":4100"))
        .stdout(predicate::str::contains("Remux"));
}

#[test]
fn test_cli_validate_global_config_flag() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"server": {"port": 4200}}"#).unwrap();

    vidrelay_cmd()
        .arg("--config")
        .arg(&path)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains(":4200"));
}

#[test]
fn test_cli_validate_malformed_config_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    vidrelay_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_cli_validate_missing_config_fails() {
    let dir = tempdir().unwrap();

    vidrelay_cmd()
        .arg("validate")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_port_env_overrides_config() {
    vidrelay_cmd()
        .env("PORT", "5150")
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains(":5150"));
}

#[test]
fn test_cli_invalid_port_env_fails() {
    vidrelay_cmd()
        .env("PORT", "not-a-port")
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PORT"));
}

#[test]
fn test_cli_check_tools_lists_tools() {
    // Exit status depends on whether ffmpeg is installed on this machine.
    vidrelay_cmd()
        .arg("check-tools")
        .assert()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_check_tools_fails_without_ffmpeg() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        format!(
            r#"{{"tools": {{"ffmpeg_path": "{}"}}}}"#,
            dir.path().join("no-ffmpeg").display()
        ),
    )
    .unwrap();

    // With PATH emptied the fallback search cannot find a real ffmpeg.
    vidrelay_cmd()
        .env("PATH", "")
        .arg("--config")
        .arg(&path)
        .arg("check-tools")
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗ ffmpeg"))
        .stderr(predicate::str::contains("ffmpeg is missing"));
}

#[test]
fn test_cli_serve_missing_directory_fails() {
    let dir = tempdir().unwrap();

    vidrelay_cmd()
        .args(["serve", "--port", "0", "--directory"])
        .arg(dir.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent"));
}
