//! Tests for multi-turn sessions.

use codex_bridge::cli::{discard, ExecOptions};
use codex_bridge::{CodexClient, CodexError, Session, SessionState};

use super::{fake_codex, ECHO_ARGS};

#[tokio::test]
async fn second_turn_resumes_last_session() {
    let (_dir, config) = fake_codex(ECHO_ARGS);
    let mut session = Session::with_defaults(
        CodexClient::new(config),
        ExecOptions::new().model("o3").json(true),
    );

    let first = session.send("start", discard()).await.unwrap();
    assert!(first.stdout.lines().any(|l| l == "--model"));
    assert!(!first.stdout.lines().any(|l| l == "resume"));
    assert_eq!(session.state(), SessionState::Active);

    let second = session.send("continue", discard()).await.unwrap();
    let args: Vec<&str> = second.stdout.lines().collect();
    assert_eq!(args, vec!["resume", "--last", "continue"]);
    assert_eq!(session.turns(), 2);
}

#[tokio::test]
async fn failed_first_turn_stays_fresh() {
    let (_dir, config) = fake_codex("echo broken >&2\nexit 1\n");
    let mut session = Session::new(CodexClient::new(config));

    let err = session.send("start", discard()).await.unwrap_err();
    assert!(matches!(err, CodexError::NonZeroExit { code: 1, .. }));
    assert_eq!(session.state(), SessionState::Fresh);
    assert_eq!(session.turns(), 0);
}

#[tokio::test]
async fn thread_id_is_remembered() {
    let (_dir, config) = fake_codex(
        "printf '%s\\n' '{\"type\":\"thread.started\",\"thread_id\":\"t-42\"}'\n",
    );
    let mut session = Session::with_defaults(CodexClient::new(config), ExecOptions::new().json(true));

    session.send("start", discard()).await.unwrap();
    assert_eq!(session.thread_id(), Some("t-42"));

    session.reset();
    assert_eq!(session.state(), SessionState::Fresh);
    assert!(session.thread_id().is_none());
}

#[tokio::test]
async fn send_with_overrides_defaults() {
    let (_dir, config) = fake_codex(ECHO_ARGS);
    let mut session = Session::new(CodexClient::new(config));

    let result = session
        .send_with("start", &ExecOptions::new().skip_git_repo_check(true), discard())
        .await
        .unwrap();
    let args: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(args, vec!["--skip-git-repo-check", "start"]);
}
