//! Tests for the client against scripted stand-ins for the Codex binary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use codex_bridge::cli::{discard, ExecOptions, Observation, Observer, ThreadEvent};
use codex_bridge::client::{CodexClient, JSON_FALLBACK_NOTICE};
use codex_bridge::config::ProcessConfig;
use codex_bridge::CodexError;
use tokio_test::{assert_err, assert_ok};

use super::{fake_codex, recorder, ECHO_ARGS};

const JSON_RUN: &str = r#"
printf '%s\n' '{"type":"thread.started","thread_id":"thread-1"}'
printf '%s\n' '{"type":"turn.started"}'
printf '%s\n' '{"type":"item.completed","item":{"type":"agent_message","id":"item_0","text":"Hello there"}}'
printf '%s\n' '{"type":"turn.completed","usage":{"input_tokens":12,"cached_input_tokens":0,"output_tokens":2}}'
echo "working" >&2
"#;

const REJECTS_JSON: &str = r#"
echo run >> runs
for a in "$@"; do
  if [ "$a" = "--json" ]; then
    echo "error: unexpected argument '--json' found" >&2
    exit 2
  fi
done
echo "plain answer"
"#;

#[tokio::test]
async fn json_run_collects_events() {
    let (_dir, config) = fake_codex(JSON_RUN);
    let client = CodexClient::new(config);
    let (observer, seen) = recorder();

    let result = client
        .execute("say hello", &ExecOptions::new().json(true), observer)
        .await
        .unwrap();

    assert!(result.success());
    assert!(result.command.contains("--json"));
    assert_eq!(result.events.len(), 4);
    assert_eq!(result.final_message(), "Hello there");
    assert_eq!(result.thread_id(), Some("thread-1"));
    assert_eq!(result.stderr, "working");

    let completed: Vec<&ThreadEvent> = result
        .events
        .iter()
        .filter(|e| e.kind == ThreadEvent::TURN_COMPLETED)
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].usage.unwrap().output_tokens, Some(2));

    let seen = seen.lock().unwrap();
    let events = seen
        .iter()
        .filter(|o| matches!(o, Observation::Event(_)))
        .count();
    assert_eq!(events, 4);
    assert!(seen.contains(&Observation::Stderr("working".to_string())));
}

#[tokio::test]
async fn plain_run_keeps_text() {
    let (_dir, config) = fake_codex(JSON_RUN);
    let client = CodexClient::new(config);

    let result = client
        .execute("say hello", &ExecOptions::new(), discard())
        .await
        .unwrap();

    assert!(result.events.is_empty());
    assert!(!result.command.contains("--json"));
    assert!(result.stdout.contains("thread.started"));
}

#[tokio::test]
async fn prompt_reaches_the_tool_verbatim() {
    let (_dir, config) = fake_codex(ECHO_ARGS);
    let client = CodexClient::new(config);
    let prompt = "it's a \"test\" with $HOME and `backticks`";

    let result = client
        .execute(prompt, &ExecOptions::new(), discard())
        .await
        .unwrap();

    assert_eq!(result.stdout.lines().last(), Some(prompt));
}

#[tokio::test]
async fn prompt_via_stdin() {
    let (_dir, config) = fake_codex("printf 'arg:%s\\n' \"$@\"\ncat\n");
    let client = CodexClient::new(config);

    let result = client
        .execute(
            "read me from stdin",
            &ExecOptions::new().prompt_via_stdin(true),
            discard(),
        )
        .await
        .unwrap();

    assert!(result.stdout.contains("arg:-"));
    assert!(result.stdout.contains("read me from stdin"));
    assert!(!result.command.contains("read me"));
}

#[tokio::test]
async fn empty_prompt_fails_without_spawning() {
    let (dir, config) = fake_codex("echo run >> runs\n");
    let client = CodexClient::new(config);

    let err = assert_err!(client.execute("", &ExecOptions::new(), discard()).await);

    assert!(matches!(err, CodexError::PromptRequired));
    assert!(!dir.path().join("runs").exists());
}

#[tokio::test]
async fn empty_prompt_is_allowed_on_resume() {
    let (_dir, config) = fake_codex(ECHO_ARGS);
    let client = CodexClient::new(config);

    let result = assert_ok!(
        client
            .execute("", &ExecOptions::new().resume_last(), discard())
            .await
    );
    assert_eq!(result.stdout, "resume\n--last");
}

#[tokio::test]
async fn non_zero_exit_carries_output() {
    let (_dir, config) = fake_codex("echo partial\necho boom >&2\nexit 3\n");
    let client = CodexClient::new(config);

    let err = client
        .execute("fail", &ExecOptions::new(), discard())
        .await
        .unwrap_err();

    match &err {
        CodexError::NonZeroExit {
            code,
            stdout,
            stderr,
        } => {
            assert_eq!(*code, 3);
            assert_eq!(stdout, "partial");
            assert_eq!(stderr, "boom");
        }
        other => panic!("Expected NonZeroExit, got {other:?}"),
    }
    assert_eq!(err.partial_output(), Some("partial"));
}

#[tokio::test]
async fn timeout_wins_over_exit_zero() {
    let (_dir, config) = fake_codex(
        "trap 'exit 0' TERM\necho started\nwhile true; do sleep 0.1; done\n",
    );
    let client = CodexClient::new(config);
    let options = ExecOptions::new().timeout(Duration::from_millis(300));

    let started = Instant::now();
    let err = client
        .execute("loop", &options, discard())
        .await
        .unwrap_err();

    match err {
        CodexError::Timeout { timeout, stdout, .. } => {
            assert_eq!(timeout, Duration::from_millis(300));
            assert_eq!(stdout, "started");
        }
        other => panic!("Expected Timeout, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn timeout_escalates_to_kill() {
    let (_dir, config) = fake_codex("trap '' TERM\nwhile true; do sleep 0.1; done\n");
    let client = CodexClient::new(config);
    let options = ExecOptions::new().timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = client
        .execute("stubborn", &options, discard())
        .await
        .unwrap_err();

    assert!(matches!(err, CodexError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn fast_exit_beats_timeout() {
    let (_dir, config) = fake_codex("echo quick\n");
    let client = CodexClient::new(config);
    let options = ExecOptions::new().timeout(Duration::from_secs(10));

    let result = client.execute("go", &options, discard()).await.unwrap();
    assert_eq!(result.final_message(), "quick");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_observer_still_receives_every_line() {
    let (_dir, config) = fake_codex(
        "i=0\nwhile [ $i -lt 4000 ]; do echo \"line $i\"; i=$((i+1)); done\n",
    );
    let client = CodexClient::new(config.drain_grace(Duration::from_millis(250)));
    let observed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&observed);
    let observer: Arc<dyn Observer> = Arc::new(move |_: Observation| {
        std::thread::sleep(Duration::from_micros(200));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let result = client
        .execute("flood", &ExecOptions::new(), observer)
        .await
        .unwrap();

    assert_eq!(result.stdout.lines().count(), 4000);
    assert_eq!(result.stdout.lines().last(), Some("line 3999"));
    assert_eq!(observed.load(Ordering::SeqCst), 4000);
}

#[tokio::test]
async fn idle_pipe_held_by_grandchild_is_abandoned() {
    let (_dir, config) = fake_codex("echo done\nsleep 5 &\n");
    let client = CodexClient::new(config);

    let started = Instant::now();
    let result = client
        .execute("detach", &ExecOptions::new(), discard())
        .await
        .unwrap();

    assert_eq!(result.final_message(), "done");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn json_rejection_retries_once_without_flag() {
    let (dir, config) = fake_codex(REJECTS_JSON);
    let client = CodexClient::new(config);
    let (observer, seen) = recorder();

    let result = client
        .execute_with_fallback("hello", &ExecOptions::new().json(true), observer)
        .await
        .unwrap();

    assert_eq!(result.final_message(), "plain answer");
    assert!(!result.command.contains("--json"));
    let runs = std::fs::read_to_string(dir.path().join("runs")).unwrap();
    assert_eq!(runs.lines().count(), 2);

    let seen = seen.lock().unwrap();
    let position = |needle: &str| seen.iter().position(|o| o.line() == Some(needle));
    let rejected = position("error: unexpected argument '--json' found").unwrap();
    let notice = position(JSON_FALLBACK_NOTICE).unwrap();
    let answer = position("plain answer").unwrap();
    assert!(rejected < notice);
    assert!(notice < answer);
    assert!(matches!(seen[notice], Observation::Stderr(_)));
}

#[tokio::test]
async fn json_fallback_is_not_repeated() {
    let (dir, config) = fake_codex(
        "echo run >> runs\necho \"error: unexpected argument '--json' found\" >&2\nexit 2\n",
    );
    let client = CodexClient::new(config);
    let (observer, seen) = recorder();

    let err = client
        .execute_with_fallback("hello", &ExecOptions::new().json(true), observer)
        .await
        .unwrap_err();

    assert!(matches!(err, CodexError::NonZeroExit { code: 2, .. }));
    let runs = std::fs::read_to_string(dir.path().join("runs")).unwrap();
    assert_eq!(runs.lines().count(), 2);
    let notices = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|o| o.line() == Some(JSON_FALLBACK_NOTICE))
        .count();
    assert_eq!(notices, 1);
}

#[tokio::test]
async fn other_failures_do_not_retry() {
    let (dir, config) = fake_codex("echo run >> runs\necho nope >&2\nexit 1\n");
    let client = CodexClient::new(config);

    let err = client
        .execute_with_fallback("hello", &ExecOptions::new().json(true), discard())
        .await
        .unwrap_err();

    assert!(!err.is_json_flag_rejection());
    let runs = std::fs::read_to_string(dir.path().join("runs")).unwrap();
    assert_eq!(runs.lines().count(), 1);
}

#[tokio::test]
async fn active_session_resumes_last() {
    let (_dir, config) = fake_codex(ECHO_ARGS);
    let client = CodexClient::new(config);
    let options = ExecOptions::new()
        .json(true)
        .model("o3")
        .sandbox(codex_bridge::cli::SandboxMode::ReadOnly);

    let result = client
        .send_turn("next", &options, true, discard())
        .await
        .unwrap();

    let args: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(args, vec!["resume", "--last", "next"]);
    assert!(result.events.is_empty());
}

#[tokio::test]
async fn explicit_session_id_is_kept() {
    let (_dir, config) = fake_codex(ECHO_ARGS);
    let client = CodexClient::new(config);
    let options = ExecOptions::new().resume_session("abc-123");

    let result = client
        .send_turn("next", &options, true, discard())
        .await
        .unwrap();

    let args: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(args, vec!["resume", "abc-123", "next"]);
}

#[tokio::test]
async fn send_prompt_returns_final_message() {
    let (_dir, config) = fake_codex(JSON_RUN);
    let client = CodexClient::new(config);

    let answer = client
        .send_prompt("hi", &ExecOptions::new().json(true))
        .await
        .unwrap();
    assert_eq!(answer, "Hello there");
}

#[tokio::test]
async fn missing_executable_is_command_not_found() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = ProcessConfig::new()
        .executable("definitely-not-a-codex-binary")
        .shell("/bin/sh")
        .login_shell(false)
        .working_dir(dir.path());
    let client = CodexClient::new(config);

    let err = client
        .execute("hi", &ExecOptions::new(), discard())
        .await
        .unwrap_err();
    assert!(matches!(err, CodexError::CommandNotFound { .. }));
}

#[tokio::test]
async fn missing_shell_is_command_not_found() {
    let config = ProcessConfig::new()
        .shell("/nonexistent/shell")
        .login_shell(false);
    let client = CodexClient::new(config);

    let err = client
        .execute("hi", &ExecOptions::new(), discard())
        .await
        .unwrap_err();
    assert!(matches!(err, CodexError::CommandNotFound { .. }));
}
