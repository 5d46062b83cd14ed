//! Integration tests driving the `wt` binary.
//!
//! Nothing here talks to Clockify: commands that need the API are only
//! exercised up to their credential checks.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn wt_binary() -> String {
    env!("CARGO_BIN_EXE_wt").to_string()
}

/// Runs `wt` with an isolated home and no `WT_*` variables.
fn run_wt(home: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(wt_binary());
    command
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("WT_") {
            command.env_remove(key);
        }
    }
    command.args(args).output().expect("failed to run wt")
}

fn write_config(dir: &Path, contents: &str) -> String {
    let path = dir.join("wt.toml");
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    let output = run_wt(temp.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["reconcile", "split-lunch", "preview", "projects"] {
        assert!(stdout.contains(command), "help should list {command}: {stdout}");
    }
}

#[test]
fn test_reconcile_without_api_key_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_wt(temp.path(), &["reconcile", "--dry-run"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("WT_API_KEY"), "unexpected stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_preview_works_offline_with_config_file() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        r#"
timezone = "America/New_York"

[rules.lunch]
start = "13:00"
end = "14:00"
"#,
    );

    let output = run_wt(
        temp.path(),
        &[
            "--config",
            &config,
            "preview",
            "--start",
            "2025-01-28 12:00",
            "--end",
            "2025-01-28 21:00",
        ],
    );
    assert!(
        output.status.success(),
        "preview should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(America/New_York)"));
    assert!(stdout.contains("split into 2 segments"));
    assert!(stdout.contains("Tue 2025-01-28 12:00..13:00"));
    assert!(stdout.contains("Tue 2025-01-28 14:00..20:00"));
}

#[test]
fn test_preview_json_is_parseable() {
    let temp = TempDir::new().unwrap();
    let output = run_wt(
        temp.path(),
        &[
            "preview",
            "--json",
            "--start",
            "2025-01-25T09:00:00Z",
            "--end",
            "2025-01-25T10:00:00Z",
        ],
    );
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["outcome"]["action"], "delete");
    assert_eq!(value["outcome"]["reason"], "weekend");
}

#[test]
fn test_invalid_timezone_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "timezone = \"Mars/Olympus\"\n");

    let output = run_wt(
        temp.path(),
        &[
            "--config",
            &config,
            "preview",
            "--start",
            "2025-01-28 10:00",
            "--end",
            "2025-01-28 11:00",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to load configuration"),
        "unexpected stderr: {stderr}"
    );
}
