//! Integration tests for the meshestra-wire CLI
//!
//! These tests run the actual binary against declaration models written to a temp dir.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn wire_cmd() -> Command {
    let mut cmd = Command::cargo_bin("meshestra-wire").unwrap();
    cmd.env_remove("MESHESTRA_UNIT_PREFIX")
        .env_remove("MESHESTRA_BUILDER_SUFFIX")
        .env_remove("RUST_LOG");
    cmd
}

const LOADER_MODEL: &str = r#"{
    "components": {
        "LoaderComponent": {
            "entry_points": [{ "name": "loader", "key": { "ty": "Loader", "qualifier": "remote" } }],
            "modules": ["LoaderModule"]
        }
    },
    "modules": {
        "LoaderModule": {
            "default_constructible": true,
            "factories": [
                {
                    "name": "remote",
                    "key": { "ty": "Loader", "qualifier": "remote" },
                    "provision": { "kind": "factory" },
                    "params": [{ "ty": "Loader", "qualifier": "local" }]
                },
                {
                    "name": "local",
                    "key": { "ty": "Loader", "qualifier": "local" },
                    "provision": { "kind": "factory" }
                }
            ]
        }
    }
}"#;

const BROKEN_MODEL: &str = r#"{
    "components": {
        "CyclicComponent": {
            "entry_points": [{ "name": "a", "key": { "ty": "A" } }],
            "modules": ["CyclicModule"]
        },
        "GoodComponent": {
            "entry_points": [{ "name": "b", "key": { "ty": "B" } }],
            "modules": ["CyclicModule"]
        }
    },
    "modules": {
        "CyclicModule": {
            "factories": [
                { "name": "a", "key": { "ty": "A" }, "provision": { "kind": "factory" }, "params": [{ "ty": "A" }] },
                { "name": "b", "key": { "ty": "B" }, "provision": { "kind": "factory" } }
            ]
        }
    }
}"#;

fn write_model(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_help_flag() {
    wire_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Compile dependency injection declarations"));
}

#[test]
fn test_compile_single_component_as_json() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "loader.json", LOADER_MODEL);

    let output = wire_cmd()
        .args(["compile", model.to_str().unwrap(), "--component", "LoaderComponent"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let unit: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(unit["name"], "WiredLoaderComponent");
    assert_eq!(unit["fields"][0]["name"], "local");
    assert_eq!(unit["fields"][1]["name"], "remote");
    assert_eq!(unit["accessors"][0]["access"]["kind"], "field");
}

#[test]
fn test_compile_as_rust() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "loader.json", LOADER_MODEL);

    wire_cmd()
        .args(["compile", model.to_str().unwrap(), "--format", "rust"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pub struct WiredLoaderComponent"))
        .stdout(predicate::str::contains("WiredLoaderComponentBuilder"))
        .stdout(predicate::str::contains("OnceLock"));
}

#[test]
fn test_unit_prefix_from_environment() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "loader.json", LOADER_MODEL);

    wire_cmd()
        .env("MESHESTRA_UNIT_PREFIX", "Dagger")
        .args(["compile", model.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("DaggerLoaderComponent"));
}

#[test]
fn test_failing_component_reports_diagnostics() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "broken.json", BROKEN_MODEL);

    wire_cmd()
        .args(["compile", model.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[cyclic-dependency]"))
        .stderr(predicate::str::contains("A -> A"))
        .stderr(predicate::str::contains("1 of 2 component(s) failed"));
}

#[test]
fn test_check_reports_clean_components() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "loader.json", LOADER_MODEL);

    wire_cmd()
        .args(["check", model.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 component(s) compiled cleanly"));
}

#[test]
fn test_missing_model_file() {
    wire_cmd()
        .args(["compile", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read declaration model"));
}
