//! CLI integration tests
//!
//! These tests drive the `mvx` binary end to end on scratch files.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn mvx(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mvx"))
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn seeded(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("model.json");
    let output = mvx(&["seed", path.to_str().unwrap(), "--vectors", "2"]);
    assert!(
        output.status.success(),
        "seed failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    path
}

#[test]
fn test_seed_writes_a_loadable_record() {
    // GIVEN an empty scratch directory
    let temp_dir = TempDir::new().unwrap();

    // WHEN a sample record is seeded
    let path = seeded(&temp_dir);

    // THEN the file is JSON with a session root
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["model_type"], "Session");
    assert_eq!(json["root"]["model_type"], "SessionItem");
}

#[test]
fn test_inspect_prints_tree_with_identifiers() {
    // GIVEN a seeded record
    let temp_dir = TempDir::new().unwrap();
    let path = seeded(&temp_dir);

    // WHEN inspected
    let output = mvx(&["inspect", path.to_str().unwrap()]);

    // THEN every item is listed, vectors with their axes
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Session (11 items)"), "{}", stdout);
    assert!(stdout.contains("title [Property]"));
    assert!(stdout.contains("= Sample session"));
    assert!(stdout.contains("items[1] v1 [Vector]"));
    assert!(stdout.contains("Z[0] Z [Property]"));
}

#[test]
fn test_render_property_table_from_container() {
    // GIVEN a seeded record and the identifier of its container
    let temp_dir = TempDir::new().unwrap();
    let path = seeded(&temp_dir);
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let shapes = json["root"]["tags"][0]["children"][1]["identifier"]
        .as_str()
        .unwrap()
        .to_string();

    // WHEN rendered as a property table rooted there
    let output = mvx(&[
        "render",
        path.to_str().unwrap(),
        "--strategy",
        "property_table",
        "--root",
        &shapes,
    ]);

    // THEN one row per vector, one column per axis
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["X  Y    Z", "0  0.5  1", "1  1.5  2"]);
}

#[test]
fn test_render_uses_config_strategy() {
    // GIVEN a config selecting the flat child listing
    let temp_dir = TempDir::new().unwrap();
    let path = seeded(&temp_dir);
    let config = temp_dir.path().join("mvx.toml");
    fs::write(&config, "[projection]\nstrategy = \"children\"\n").unwrap();

    // WHEN rendered with it
    let output = mvx(&[
        "render",
        path.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);

    // THEN only the root's two children appear
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Name"));
    assert!(lines[1].starts_with("title"));
    assert!(lines[2].starts_with("shapes"));
}

#[test]
fn test_missing_file_reports_error() {
    // WHEN a non-existent record is inspected
    let output = mvx(&["inspect", "/definitely/not/here.json"]);

    // THEN the CLI fails with an error message
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}

#[test]
fn test_malformed_record_reports_serialization_error() {
    // GIVEN a file that is not a record
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    // WHEN rendered
    let output = mvx(&["render", path.to_str().unwrap()]);

    // THEN the serialization failure surfaces
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Serialization error"));
}
