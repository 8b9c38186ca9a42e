//! Per-call accumulation of output lines and events.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cli::{ThreadEvent, Usage};

/// Placeholder answer when a call produced no output at all.
pub const NO_OUTPUT: &str = "(no output)";

/// Lines and events gathered while a process runs.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub events: Vec<ThreadEvent>,
}

/// Shared accumulator written by both stream tasks.
///
/// Every append goes through the mutex, so the two readers never interleave
/// partial writes.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    inner: Arc<Mutex<Collected>>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_stdout(&self, line: String) {
        self.inner.lock().await.stdout.push(line);
    }

    pub async fn push_stderr(&self, line: String) {
        self.inner.lock().await.stderr.push(line);
    }

    pub async fn push_event(&self, event: ThreadEvent) {
        self.inner.lock().await.events.push(event);
    }

    /// Stdout plus stderr lines recorded so far.
    pub async fn line_count(&self) -> usize {
        let collected = self.inner.lock().await;
        collected.stdout.len() + collected.stderr.len()
    }

    /// Take everything collected so far, leaving the collector empty.
    pub async fn take(&self) -> Collected {
        std::mem::take(&mut *self.inner.lock().await)
    }
}

/// Outcome of a completed `codex exec` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecResult {
    /// Command string handed to the host shell.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Decoded events, in stdout order.
    pub events: Vec<ThreadEvent>,
}

impl ExecResult {
    /// Assemble a result from collected state.
    #[must_use]
    pub fn from_collected(command: String, exit_code: i32, collected: Collected) -> Self {
        Self {
            command,
            stdout: collected.stdout.join("\n"),
            stderr: collected.stderr.join("\n"),
            exit_code,
            events: collected.events,
        }
    }

    /// The answer to show for this call.
    ///
    /// The last completed agent message wins when events were decoded.
    /// Otherwise this is the trimmed stdout, then the trimmed stderr, then
    /// a placeholder.
    #[must_use]
    pub fn final_message(&self) -> &str {
        if let Some(text) = self.events.iter().rev().find_map(ThreadEvent::agent_text) {
            return text.trim();
        }
        [self.stdout.trim(), self.stderr.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or(NO_OUTPUT)
    }

    /// Thread identifier announced by `thread.started`.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.events.iter().find_map(|e| e.thread_id.as_deref())
    }

    /// Usage counters from the last event that reported them.
    #[must_use]
    pub fn usage(&self) -> Option<Usage> {
        self.events.iter().rev().find_map(|e| e.usage)
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
