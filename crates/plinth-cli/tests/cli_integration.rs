//! Integration tests driving the compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn write_manifest(dir: &Path, namespace: &str, project_type: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("manifest.json"),
        format!(r#"{{"namespace":"{namespace}","type":"{project_type}"}}"#),
    )
    .unwrap();
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("plinth")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn build_all_produces_artifact_trees() {
    let temp = tempfile::tempdir().unwrap();
    let working = temp.path().join("app/webapp");
    write_manifest(&working, "my.app", "application");
    fs::write(working.join("Component.js"), "const Component = {};\n").unwrap();

    Command::cargo_bin("plinth")
        .unwrap()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .success();

    let dist = temp.path().join("app/dist");
    assert!(dist.join("Component.js").exists());
    assert!(dist.join("Component-preload.js").exists());
    assert!(dist.join("Component-debug.js").exists());
}

#[test]
fn build_single_project_by_serve_path() {
    let temp = tempfile::tempdir().unwrap();
    write_manifest(&temp.path().join("app/webapp"), "my.app", "application");
    write_manifest(&temp.path().join("lib/src"), "my.lib", "library");

    Command::cargo_bin("plinth")
        .unwrap()
        .args(["build", "/app", "--root"])
        .arg(temp.path())
        .assert()
        .success();

    assert!(temp.path().join("app/dist").exists());
    // only the requested project was built
    assert!(!temp.path().join("lib/dist").exists());
}

#[test]
fn build_unknown_project_fails() {
    let temp = tempfile::tempdir().unwrap();
    write_manifest(&temp.path().join("app/webapp"), "my.app", "application");

    Command::cargo_bin("plinth")
        .unwrap()
        .args(["build", "/missing", "--root"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("/missing"));
}

#[test]
fn build_empty_workspace_fails() {
    let temp = tempfile::tempdir().unwrap();

    Command::cargo_bin("plinth")
        .unwrap()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .failure();
}
