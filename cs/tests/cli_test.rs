//! CLI tests for the cs binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn write_payload(dir: &TempDir, name: &str, value: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).expect("Failed to write payload");
    path
}

fn cs(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cs").expect("cs binary not built");
    // Keep config lookup inside the temp dir
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_estimate_small_payload() {
    let temp = TempDir::new().unwrap();
    let path = write_payload(&temp, "small.json", &json!({"rows": [{"id": 1}]}));

    cs(&temp)
        .arg("estimate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("tokens (gpt-4)"));
}

#[test]
fn test_estimate_with_model_override() {
    let temp = TempDir::new().unwrap();
    let path = write_payload(&temp, "small.json", &json!({"a": 1}));

    cs(&temp)
        .args(["estimate", "--model", "gpt-4o", "--formatted"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("(gpt-4o)"));
}

#[test]
fn test_split_fits_inline() {
    let temp = TempDir::new().unwrap();
    let path = write_payload(&temp, "small.json", &json!({"rows": [{"id": 1}, {"id": 2}]}));

    cs(&temp)
        .arg("split")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("fits inline"));
}

#[test]
fn test_split_reports_chunks() {
    let temp = TempDir::new().unwrap();
    let rows: Vec<_> = (0..500)
        .map(|i| json!({"id": i, "name": format!("customer-{i}"), "region": "emea"}))
        .collect();
    let path = write_payload(&temp, "large.json", &json!({"rows": rows}));

    cs(&temp)
        .args(["split", "--budget", "500"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("chunks, 500 records"))
        .stdout(predicate::str::contains("chunk    0:"));
}

#[test]
fn test_split_warns_on_oversized_record() {
    let temp = TempDir::new().unwrap();
    let path = write_payload(
        &temp,
        "blob.json",
        &json!({"rows": [{"id": 1}, {"id": 2, "blob": "x".repeat(4000)}, {"id": 3}]}),
    );

    cs(&temp)
        .env_remove("RUST_LOG")
        .args(["split", "--budget", "100"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("oversized"))
        .stderr(predicate::str::contains("Single record exceeds budget"));
}

#[test]
fn test_zero_session_ttl_rejected() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("chunkstore.yml");
    std::fs::write(&config, "session-ttl-seconds: 0\n").unwrap();
    let path = write_payload(&temp, "small.json", &json!({"a": 1}));

    cs(&temp)
        .arg("--config")
        .arg(&config)
        .arg("estimate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_missing_file_fails() {
    let temp = TempDir::new().unwrap();

    cs(&temp)
        .args(["estimate", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_invalid_json_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.json");
    std::fs::write(&path, "{not json").unwrap();

    cs(&temp)
        .arg("estimate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse JSON"));
}
