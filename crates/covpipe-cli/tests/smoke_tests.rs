//! Smoke tests for the covpipe CLI
//!
//! These tests drive the binary on small records written to a temp dir.
//! Nothing here needs lcov, genhtml or an instrumented build.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command for the covpipe binary
fn covpipe() -> Command {
    let mut cmd = Command::cargo_bin("covpipe").expect("covpipe binary should exist");
    cmd.env_remove("CI")
        .env_remove("RUST_LOG")
        .env_remove("COVPIPE_CONFIG")
        .env_remove("COVPIPE_LCOV");
    cmd
}

/// Temp project with `src/`, `vendor/` and two records naming both
fn project() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("vendor")).unwrap();
    let r = root.display();
    fs::write(
        root.join("unit.info"),
        format!("SF:{r}/src/a.rs\nDA:10,1\nDA:11,0\nend_of_record\n"),
    )
    .unwrap();
    fs::write(
        root.join("integration.info"),
        format!(
            "SF:{r}/src/a.rs\nDA:10,2\nDA:12,1\nend_of_record\nSF:{r}/vendor/b.rs\nDA:1,4\nend_of_record\n"
        ),
    )
    .unwrap();
    (temp, root)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    covpipe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    covpipe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("filter"));
}

#[test]
fn test_run_help() {
    covpipe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--ci"))
        .stdout(predicate::str::contains("--owned-root"))
        .stdout(predicate::str::contains("--render-failure"));
}

#[test]
fn test_unknown_subcommand() {
    covpipe().arg("collect").assert().failure();
}

// ============================================================================
// Record Commands
// ============================================================================

#[test]
fn test_merge_then_filter_native() {
    let (_temp, root) = project();

    covpipe()
        .current_dir(&root)
        .args([
            "merge",
            "unit.info",
            "integration.info",
            "-o",
            "coverage.info",
            "--translator",
            "native",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged 2 records"));
    assert!(read(&root.join("coverage.info")).contains("DA:10,3"));

    covpipe()
        .current_dir(&root)
        .args(["filter", "--translator", "native"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept 1 files"));

    let final_record = read(&root.join("final.info"));
    assert!(final_record.contains("/src/a.rs"));
    assert!(!final_record.contains("/vendor/b.rs"));
    assert!(final_record.contains("DA:11,0"));
}

#[test]
fn test_merge_needs_two_inputs() {
    let (_temp, root) = project();
    covpipe()
        .current_dir(&root)
        .args(["merge", "unit.info", "--translator", "native"])
        .assert()
        .failure();
}

#[test]
fn test_merge_missing_input() {
    let (_temp, root) = project();
    covpipe()
        .current_dir(&root)
        .args(["merge", "unit.info", "absent.info", "--translator", "native"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Coverage record not found"));
    assert!(!root.join("coverage.info").exists());
}

#[test]
fn test_filter_missing_root() {
    let (_temp, root) = project();
    fs::copy(root.join("integration.info"), root.join("coverage.info")).unwrap();
    covpipe()
        .current_dir(&root)
        .args(["filter", "-r", "lib", "--translator", "native"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("owned root"));
}

#[test]
fn test_summary_text_and_json() {
    let (_temp, root) = project();

    covpipe()
        .current_dir(&root)
        .args(["--color", "never", "summary", "integration.info", "--files"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary coverage rate (2 files)"))
        .stdout(predicate::str::contains("Hit/Found"));

    let output = covpipe()
        .current_dir(&root)
        .args(["summary", "unit.info", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["lines_found"], 2);
    assert_eq!(value["lines_hit"], 1);
}

#[test]
fn test_summary_missing_record() {
    let temp = TempDir::new().unwrap();
    covpipe()
        .current_dir(temp.path())
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Coverage record not found"));
}

// ============================================================================
// Workspace Commands
// ============================================================================

#[test]
fn test_clean_keeps_unit_record() {
    let (_temp, root) = project();
    fs::create_dir_all(root.join("target/debug/deps")).unwrap();
    fs::write(root.join("target/debug/deps/lib.gcda"), "").unwrap();

    covpipe()
        .args(["clean", "-C"])
        .arg(&root)
        .args(["--keep", "unit.info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept"));

    assert!(root.join("unit.info").exists());
    assert!(!root.join("integration.info").exists());
    assert!(!root.join("target").exists());
}

#[test]
fn test_config_defaults() {
    covpipe()
        .args(["config", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("merged_name: coverage.info"))
        .stdout(predicate::str::contains("final_name: final.info"));
}

#[test]
fn test_config_reads_project_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("covpipe.yaml"),
        "owned_roots: [src, crates/core/src]\nci: true\n",
    )
    .unwrap();

    let output = covpipe()
        .args(["config", "--format", "json", "-C"])
        .arg(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["ci"], true);
    assert_eq!(value["owned_roots"][1], "crates/core/src");
}

#[test]
fn test_config_rejects_bad_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("covpipe.yaml"), "render_failure: sometimes\n").unwrap();
    covpipe()
        .args(["config", "-C"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
