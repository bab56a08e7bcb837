//! CLI tests for Nexible
//!
//! These run the built binary with assert_cmd and cover:
//! - Help and module listing
//! - Parameter errors reported before any device is contacted
//! - Exit codes per error class
//! - JSON output mode
//! - Config loading failures

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// Helper to get a command isolated from the user's config files
fn nexible_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nexible").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("NEXIBLE_CONFIG")
        .env_remove("NEXIBLE_TIMEOUT")
        .env_remove("NEXIBLE_PROTOCOL")
        .env_remove("NEXIBLE_USERNAME")
        .env_remove("NEXIBLE_PASSWORD")
        .env_remove("NEXIBLE_SSH_PORT")
        .env_remove("RUST_LOG")
        .current_dir(home.path());
    cmd
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vrf"))
        .stdout(predicate::str::contains("install-config"))
        .stdout(predicate::str::contains("list-modules"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_list_modules() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .arg("list-modules")
        .assert()
        .success()
        .stdout(predicate::str::contains("nxos_vrf"))
        .stdout(predicate::str::contains("nxos_install_config"));
}

#[test]
fn test_list_modules_json() {
    let home = TempDir::new().unwrap();
    let output = nexible_cmd(&home)
        .args(["--output", "json", "list-modules"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = listing
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["name"].as_str())
        .collect();
    assert_eq!(names, vec!["nxos_install_config", "nxos_vrf"]);
}

#[test]
fn test_reserved_vrf_name_rejected() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .args(["vrf", "--host", "127.0.0.1", "--name", "default"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("reserved"));
}

#[test]
fn test_reserved_vrf_name_rejected_any_case() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .args(["vrf", "--host", "127.0.0.1", "--vrf", "DEFAULT"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("reserved"));
}

#[test]
fn test_vrf_requires_host() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .args(["vrf", "--name", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--host"));
}

#[test]
fn test_install_config_missing_file() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .args([
            "install-config",
            "--host",
            "127.0.0.1",
            "--config-file",
            "does-not-exist.cfg",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_run_rejects_non_object_params() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .args(["run", "nxos_vrf", "--params", "[1, 2]"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("--params"));
}

#[test]
fn test_run_unknown_module() {
    let home = TempDir::new().unwrap();
    nexible_cmd(&home)
        .args(["run", "nxos_bgp", "--params", "{}"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nxos_bgp"));
}

#[test]
fn test_json_error_output() {
    let home = TempDir::new().unwrap();
    let output = nexible_cmd(&home)
        .args([
            "--output",
            "json",
            "vrf",
            "--host",
            "127.0.0.1",
            "--name",
            "default",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));

    let error: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().contains("reserved"));
}

#[test]
fn test_bad_config_falls_back_to_defaults() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    std::fs::write(&config, "[defaults\ntimeout = ").unwrap();

    nexible_cmd(&home)
        .args(["-c", config.to_str().unwrap(), "list-modules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nxos_vrf"))
        .stderr(predicate::str::contains("WARNING"));
}
