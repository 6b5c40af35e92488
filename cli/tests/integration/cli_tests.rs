//! Integration tests for the hcutils command line
//!
//! These tests spawn the binary. None of them reach a real Cloud API: they
//! stop at argument parsing, configuration, input validation, or a refused
//! connection to a local port.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with a clean, isolated environment.
fn hcutils(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hcutils"));
    cmd.env("NO_COLOR", "1")
        .env("HCUTILS_CONFIG", home.path().join("config.yaml"))
        .env_remove("HCLOUD_TOKEN")
        .env_remove("HCLOUD_ENDPOINT")
        .env_remove("RUST_LOG");
    cmd
}

/// Like `hcutils`, authenticated against an endpoint nothing listens on.
fn hcutils_offline(home: &TempDir) -> Command {
    let mut cmd = hcutils(home);
    cmd.env("HCLOUD_TOKEN", "test-token")
        .env("HCLOUD_ENDPOINT", "http://127.0.0.1:9/v1");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_help_lists_download_and_upload() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("upload"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hcutils"));
}

#[test]
fn test_download_volume_help_documents_flags() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .args(["download", "volume", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--id"))
        .stdout(predicate::str::contains("--out"))
        .stdout(predicate::str::contains("--type"))
        .stdout(predicate::str::contains("archive"))
        .stdout(predicate::str::contains("image"));
}

#[test]
fn test_upload_volume_help_documents_flags() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .args(["upload", "volume", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--location"))
        .stdout(predicate::str::contains("--size"))
        .stdout(predicate::str::contains("--name"));
}

// --- Argument validation ---

#[test]
fn test_download_requires_id() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .args(["download", "volume"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--id"));
}

#[test]
fn test_download_rejects_unknown_type() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .args(["download", "volume", "--id", "42", "--type", "zip"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value 'zip'"));
}

#[test]
fn test_upload_requires_location_and_size() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .args(["upload", "volume", "volume.tar.gz"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--location"))
        .stderr(predicate::str::contains("--size"));
}

// --- Preconditions ---

#[test]
fn test_missing_token_fails_before_any_request() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .args(["download", "volume", "--id", "42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "HCLOUD_TOKEN environment variable is not set",
        ));
}

#[test]
fn test_blank_token_counts_as_missing() {
    let home = TempDir::new().expect("tempdir");
    hcutils(&home)
        .env("HCLOUD_TOKEN", "   ")
        .args(["upload", "volume", "x.tar.gz", "--location", "fsn1", "--size", "10"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("HCLOUD_TOKEN"));
}

#[test]
fn test_malformed_config_file_is_reported() {
    let home = TempDir::new().expect("tempdir");
    std::fs::write(home.path().join("config.yaml"), "server: [not, a, map\n").expect("write");
    hcutils_offline(&home)
        .args(["download", "volume", "--id", "42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot parse"));
}

#[test]
fn test_upload_size_below_minimum_is_rejected_locally() {
    let home = TempDir::new().expect("tempdir");
    let archive = home.path().join("volume.tar.gz");
    std::fs::write(&archive, [0x1f, 0x8b]).expect("write");
    hcutils_offline(&home)
        .arg("upload")
        .arg("volume")
        .arg(&archive)
        .args(["--location", "fsn1", "--size", "5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("volume size must be between 10"));
}

#[test]
fn test_upload_missing_file_is_rejected_locally() {
    let home = TempDir::new().expect("tempdir");
    hcutils_offline(&home)
        .args(["upload", "volume", "/nonexistent/volume.tar.gz"])
        .args(["--location", "fsn1", "--size", "10"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("/nonexistent/volume.tar.gz"));
}

#[test]
fn test_unreachable_api_is_a_transport_error() {
    let home = TempDir::new().expect("tempdir");
    hcutils_offline(&home)
        .args(["download", "volume", "--id", "42", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cloud API request failed"));
}
