//! Tests for process spawning and control.

use codex_bridge::cli::{exit_code, CodexProcess};
use codex_bridge::config::ProcessConfig;
use codex_bridge::CodexError;
use tokio::io::AsyncReadExt;

fn sh() -> ProcessConfig {
    ProcessConfig::new().shell("/bin/sh").login_shell(false)
}

async fn read_stdout(process: &mut CodexProcess) -> String {
    let mut stdout = process.take_stdout().unwrap();
    let mut out = String::new();
    stdout.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn spawn_runs_command_under_shell() {
    let mut process = CodexProcess::spawn(&sh(), "echo hello".to_string(), false).unwrap();
    assert_eq!(process.command(), "echo hello");
    assert!(process.id().is_some());

    assert_eq!(read_stdout(&mut process).await, "hello\n");
    let status = process.wait().await.unwrap();
    assert_eq!(exit_code(status), 0);
}

#[tokio::test]
async fn take_stdout_only_once() {
    let mut process = CodexProcess::spawn(&sh(), "true".to_string(), false).unwrap();
    assert!(process.take_stdout().is_some());
    assert!(process.take_stdout().is_none());
    assert!(process.take_stderr().is_some());
    assert!(process.take_stderr().is_none());
    process.wait().await.unwrap();
}

#[tokio::test]
async fn send_prompt_writes_and_closes_stdin() {
    let mut process = CodexProcess::spawn(&sh(), "cat".to_string(), true).unwrap();
    let mut stdout = process.take_stdout().unwrap();

    process.send_prompt("line one\nline two").await;

    let mut out = String::new();
    stdout.read_to_string(&mut out).await.unwrap();
    assert_eq!(out, "line one\nline two");
    assert!(process.wait().await.unwrap().success());
}

#[tokio::test]
async fn send_prompt_without_pipe_is_noop() {
    let mut process = CodexProcess::spawn(&sh(), "cat".to_string(), false).unwrap();
    process.send_prompt("ignored").await;
    assert_eq!(read_stdout(&mut process).await, "");
    process.wait().await.unwrap();
}

#[tokio::test]
async fn environment_and_working_dir_apply() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = sh()
        .working_dir(dir.path())
        .env("CODEX_BRIDGE_TEST", "from-config")
        .extra_path("/opt/codex-bridge-test/bin");
    let mut process = CodexProcess::spawn(
        &config,
        "echo \"$CODEX_BRIDGE_TEST\"; pwd; echo \"$PATH\"".to_string(),
        false,
    )
    .unwrap();

    let out = read_stdout(&mut process).await;
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "from-config");
    assert_eq!(
        std::fs::canonicalize(lines[1]).unwrap(),
        std::fs::canonicalize(dir.path()).unwrap()
    );
    assert!(lines[2].starts_with("/opt/codex-bridge-test/bin"));
    process.wait().await.unwrap();
}

#[tokio::test]
async fn kill_is_idempotent() {
    let mut process = CodexProcess::spawn(&sh(), "sleep 30".to_string(), false).unwrap();
    process.kill().await.unwrap();
    process.wait().await.unwrap();
    process.kill().await.unwrap();
    assert!(process.try_wait().unwrap().is_some());
}

#[tokio::test]
async fn exit_codes_are_reported() {
    let mut process = CodexProcess::spawn(&sh(), "exit 7".to_string(), false).unwrap();
    assert_eq!(exit_code(process.wait().await.unwrap()), 7);
}

#[tokio::test]
async fn missing_shell_is_command_not_found() {
    let config = ProcessConfig::new().shell("/definitely/missing/sh");
    let err = CodexProcess::spawn(&config, "echo hi".to_string(), false).unwrap_err();
    assert!(matches!(err, CodexError::CommandNotFound { command } if command == "echo hi"));
}
