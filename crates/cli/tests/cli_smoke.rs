//! CLI smoke tests for quarry.
//!
//! These tests verify that the commands run against real declaration files
//! and return appropriate exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the quarry binary.
fn quarry_cmd() -> Command {
  cargo_bin_cmd!("quarry")
}

/// Create a temp project with app -> lib declarations.
fn temp_project() -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::create_dir_all(temp.path().join("app")).unwrap();
  std::fs::create_dir_all(temp.path().join("lib")).unwrap();
  std::fs::write(
    temp.path().join("app/RULES.lua"),
    r#"rule { type = "binary", name = "app", deps = { "//lib:core" } }"#,
  )
  .unwrap();
  std::fs::write(
    temp.path().join("lib/RULES.lua"),
    r#"rule { type = "library", name = "core" }"#,
  )
  .unwrap();
  temp
}

#[test]
fn help_flag_works() {
  quarry_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn targets_lists_all_rules() {
  let temp = temp_project();

  quarry_cmd()
    .args(["targets", "--root"])
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("//app:app"))
    .stdout(predicate::str::contains("//lib:core"));
}

#[test]
fn targets_filters_by_type() {
  let temp = temp_project();

  quarry_cmd()
    .args(["targets", "--type", "binary", "--root"])
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("//app:app"))
    .stdout(predicate::str::contains("//lib:core").not());
}

#[test]
fn graph_prints_dependencies() {
  let temp = temp_project();

  quarry_cmd()
    .args(["graph", "//app:app", "--root"])
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("//app:app: //lib:core"))
    .stdout(predicate::str::contains("//lib:core\n"));
}

#[test]
fn graph_fails_on_missing_target() {
  let temp = temp_project();

  quarry_cmd()
    .args(["graph", "//lib:ghost", "--root"])
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("//lib:ghost"));
}

#[test]
fn graph_fails_on_cycle() {
  let temp = TempDir::new().unwrap();
  std::fs::create_dir_all(temp.path().join("pkg")).unwrap();
  std::fs::write(
    temp.path().join("pkg/RULES.lua"),
    r#"
      rule { type = "library", name = "a", deps = { ":b" } }
      rule { type = "library", name = "b", deps = { ":a" } }
    "#,
  )
  .unwrap();

  quarry_cmd()
    .args(["graph", "//pkg:a", "--root"])
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("cycle"));
}

#[test]
fn graph_requires_a_target() {
  quarry_cmd().arg("graph").assert().failure();
}

#[test]
fn missing_root_fails_with_context() {
  quarry_cmd()
    .args(["targets", "--root", "/does/not/exist"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("project root not found"));
}
