//! CLI module tests.

mod client_test;
mod process_test;
mod session_test;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use codex_bridge::cli::{Observation, Observer};
use codex_bridge::config::ProcessConfig;
use tempfile::TempDir;

/// Observer that records everything it sees.
pub fn recorder() -> (Arc<dyn Observer>, Arc<Mutex<Vec<Observation>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer: Arc<dyn Observer> = Arc::new(move |o: Observation| {
        sink.lock().unwrap().push(o);
    });
    (observer, seen)
}

/// A stand-in for the Codex binary.
///
/// The script is saved as `exec` in a fresh directory, and the executable is
/// `sh`, so the built command `sh exec <args>` runs the script with the
/// arguments a real binary would receive.
pub fn fake_codex(script: &str) -> (TempDir, ProcessConfig) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("exec"), script).unwrap();
    let config = ProcessConfig::new()
        .executable("sh")
        .shell("/bin/sh")
        .login_shell(false)
        .working_dir(dir.path())
        .terminate_grace(Duration::from_millis(300))
        .drain_grace(Duration::from_millis(500));
    (dir, config)
}

/// Script that prints each argument on its own line.
pub const ECHO_ARGS: &str = "for a in \"$@\"; do printf '%s\\n' \"$a\"; done\n";

/// Verify the public CLI types are exported from the library.
#[test]
fn test_all_cli_types_exported() {
    use codex_bridge::cli::{
        ChannelObserver, CodexProcess, Collector, CommandPlan, ExecOptions, ExecResult,
        McpConfig, McpServer, ResumeMode, StreamParser, ThreadEvent, ThreadItem,
        TimeoutGovernor, Usage,
    };
    use codex_bridge::{CodexClient, CodexError, Session, SessionState};

    let _ = ExecOptions::new();
    let _ = Collector::new();
    let _ = ChannelObserver::channel();
    let _ = McpServer::stdio("node", &["server.js"]);
    let _ = CodexClient::default();
    let _ = Session::new(CodexClient::default());
    let _ = Usage::default();

    let _: fn(&str, &ExecOptions) -> codex_bridge::Result<CommandPlan> = CommandPlan::build;
    let _: fn(&str) -> bool = StreamParser::looks_like_json;
    let _: fn() -> CodexError = || CodexError::PromptRequired;
    let _ = McpConfig::Path("/tmp/mcp.json".into());
    let _ = ResumeMode::Last;
    let _ = SessionState::Fresh;
    let _ = ThreadItem::Unknown;
    let _ = std::mem::size_of::<(CodexProcess, ExecResult, ThreadEvent, TimeoutGovernor)>();
}
