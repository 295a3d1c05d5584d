//! CLI smoke tests for the playops-server binary.

use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn run_playops_server(args: &[&str], home: &TempDir) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_playops-server"))
        .args(args)
        .env("HOME", home.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute playops-server")
}

fn write_config(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("playops.yaml");
    std::fs::write(&path, body).expect("Failed to write config file");
    path.to_string_lossy().into_owned()
}

fn minimal_config(dir: &TempDir) -> String {
    let home = dir.path().join("home");
    write_config(
        dir,
        &format!(
            r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 0

logging:
  default:
    console_level: error
    file: ""
    file_level: "off"

modules:
  time_engine:
    reconcile_interval_secs: 3600
"#,
            home.to_string_lossy()
        ),
    )
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    let output = run_playops_server(&["--help"], &home);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("playops-server") || stdout.contains("PlayOps"));
    for sub in ["run", "check", "reconcile", "watch", "--config", "--mock"] {
        assert!(stdout.contains(sub), "help should mention {sub}");
    }
}

#[test]
fn missing_config_file_fails() {
    let home = TempDir::new().unwrap();
    let output = run_playops_server(&["--config", "/nonexistent/playops.yaml", "check"], &home);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file not found"), "stderr: {stderr}");
}

#[test]
fn invalid_yaml_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "server: [unclosed");
    let output = run_playops_server(&["--config", &path, "check"], &dir);
    assert!(!output.status.success());
}

#[test]
fn check_accepts_valid_config() {
    let dir = TempDir::new().unwrap();
    let path = minimal_config(&dir);
    let output = run_playops_server(&["--config", &path, "check"], &dir);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration check passed"));
}

#[test]
fn reconcile_runs_on_the_in_memory_store() {
    let dir = TempDir::new().unwrap();
    let path = minimal_config(&dir);
    let output = run_playops_server(&["--config", &path, "--mock", "reconcile"], &dir);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0 updated, 0 failed"), "stdout: {stdout}");
}

#[tokio::test]
async fn run_keeps_serving_until_stopped() {
    let dir = TempDir::new().unwrap();
    let path = minimal_config(&dir);
    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_playops-server"));
    cmd.args(["--config", &path, "--mock", "run"])
        .env("HOME", dir.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = cmd.spawn().expect("Failed to spawn playops-server");
    let still_running = timeout(Duration::from_secs(2), child.wait()).await.is_err();
    assert!(still_running, "server exited early");
    child.kill().await.ok();
}
