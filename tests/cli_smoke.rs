//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn cli_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("nexstor");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("provision"))
        .stdout(contains("delete"));
}

#[test]
fn provision_requires_a_name() {
    let mut cmd = cargo_bin_cmd!("nexstor");
    cmd.arg("provision")
        .assert()
        .failure()
        .stderr(contains("--name"));
}

#[test]
fn provision_rejects_bad_capacity_before_loading_config() {
    let mut cmd = cargo_bin_cmd!("nexstor");
    cmd.args(["provision", "--name", "pvc-1", "--capacity", "lots"])
        .assert()
        .failure()
        .stderr(contains("invalid argument"));
}

#[test]
fn delete_reports_missing_descriptor() {
    let mut cmd = cargo_bin_cmd!("nexstor");
    cmd.args(["delete", "--descriptor", "/nonexistent/nexstor-pvc.json"])
        .assert()
        .failure()
        .stderr(contains("failed to read descriptor"));
}
