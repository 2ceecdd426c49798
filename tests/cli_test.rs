//! Integration tests for the clusterup binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const RECORD: &str = r#"{
  "INITIALIZE": {
    "SAVING_SOURCE_CLUSTER_CONFIG": "COMPLETE",
    "START_AGENTS": "COMPLETE",
    "CHECK_DISK_SPACE": "SKIPPED",
    "INIT_TARGET_CLUSTER": "FAILED"
  }
}"#;

fn state_dir_with_record() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("substeps.json"), RECORD).unwrap();
    temp
}

fn clusterup(state_dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("clusterup"));
    cmd.arg("--state-dir").arg(state_dir.path());
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("clusterup"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Show recorded substep statuses"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("clusterup"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn status_lists_recorded_substeps() -> Result<(), Box<dyn std::error::Error>> {
    let temp = state_dir_with_record();
    clusterup(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize"))
        .stdout(predicate::str::contains("START_AGENTS"))
        .stdout(predicate::str::contains("FAILED"));
    Ok(())
}

#[test]
fn status_json_is_machine_readable() -> Result<(), Box<dyn std::error::Error>> {
    let temp = state_dir_with_record();
    let output = clusterup(&temp).args(["status", "--json"]).output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["INITIALIZE"]["CHECK_DISK_SPACE"], "SKIPPED");
    Ok(())
}

#[test]
fn status_without_record_exits_2() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    clusterup(&temp)
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No status record"));
    Ok(())
}

#[test]
fn corrupt_record_exits_1() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("substeps.json"), "{ not json")?;
    clusterup(&temp)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse status record"));
    Ok(())
}

#[test]
fn reset_then_status() -> Result<(), Box<dyn std::error::Error>> {
    let temp = state_dir_with_record();
    clusterup(&temp)
        .args(["reset", "--step", "initialize", "--substep", "init-target-cluster"])
        .assert()
        .success()
        .stdout(predicate::str::contains("was FAILED"));

    clusterup(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("INIT_TARGET_CLUSTER").not());
    Ok(())
}

#[test]
fn mark_records_status() -> Result<(), Box<dyn std::error::Error>> {
    let temp = state_dir_with_record();
    clusterup(&temp)
        .args([
            "mark",
            "--step",
            "initialize",
            "--substep",
            "INIT_TARGET_CLUSTER",
            "--status",
            "complete",
        ])
        .assert()
        .success();

    let text = fs::read_to_string(temp.path().join("substeps.json"))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(value["INITIALIZE"]["INIT_TARGET_CLUSTER"], "COMPLETE");
    Ok(())
}

#[test]
fn unknown_substep_is_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = state_dir_with_record();
    clusterup(&temp)
        .args(["reset", "--step", "initialize", "--substep", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BOGUS"));
    Ok(())
}

#[test]
fn state_dir_from_environment() -> Result<(), Box<dyn std::error::Error>> {
    let temp = state_dir_with_record();
    Command::new(cargo_bin("clusterup"))
        .env("CLUSTERUP_HOME", temp.path())
        .env("NO_COLOR", "1")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("START_AGENTS"));
    Ok(())
}
