//! Per-call orchestration of `codex exec`.
//!
//! A call builds the command, launches it under the host shell, drains both
//! output streams into a [`Collector`] while forwarding observations, races
//! an optional deadline, and assembles the [`ExecResult`] once the process
//! has exited and the readers have drained.
//!
//! On top of single calls sit the turn helpers: resume negotiation for an
//! active session, and a single retry without `--json` for builds that do
//! not know the flag.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cli::{
    ensure_prompt, exit_code, discard, CodexProcess, Collector, CommandPlan, Demux, ExecOptions,
    ExecResult, Observation, Observer, TimeoutGovernor, SHELL_NOT_FOUND_EXIT,
};
use crate::config::ProcessConfig;
use crate::error::{CodexError, Result};

/// Synthetic stderr line emitted before the `--json` fallback retry.
pub const JSON_FALLBACK_NOTICE: &str =
    "codex does not support --json; retrying without structured output";

/// Client that runs Codex with a fixed process configuration.
#[derive(Debug, Clone, Default)]
pub struct CodexClient {
    config: ProcessConfig,
}

impl CodexClient {
    #[must_use]
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    /// The process configuration used for every call.
    #[must_use]
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Run one invocation exactly as described by `options`.
    ///
    /// Observations are delivered to `observer` while the process runs.
    ///
    /// # Errors
    ///
    /// - `PromptRequired` / `InvalidConfig` before anything is spawned
    /// - `CommandNotFound` / `LaunchFailed` if the process cannot start
    /// - `Timeout` if the deadline fired, whatever the exit status
    /// - `NonZeroExit` for any other failing exit
    pub async fn execute(
        &self,
        prompt: &str,
        options: &ExecOptions,
        observer: Arc<dyn Observer>,
    ) -> Result<ExecResult> {
        ensure_prompt(prompt, options)?;
        // Keeps any temporary MCP config alive until the call returns.
        let plan = CommandPlan::build(prompt, options)?;
        let command = plan.command_line(&self.config.executable);
        let json = options.json_effective();

        tracing::info!(%command, json, timeout = ?options.timeout, "Running codex");

        let mut process = CodexProcess::spawn(&self.config, command.clone(), plan.via_stdin())?;

        let collector = Collector::new();
        let demux = Demux::new(collector.clone(), observer, json, self.config.debug);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = process.take_stdout() {
            readers.push(demux.spawn_stdout(stdout));
        }
        if let Some(stderr) = process.take_stderr() {
            readers.push(demux.spawn_stderr(stderr));
        }

        let governor = options.timeout.map(|timeout| {
            TimeoutGovernor::arm(
                timeout,
                process.id(),
                self.config.terminate_grace_duration(),
            )
        });

        if plan.via_stdin() {
            process.send_prompt(prompt).await;
        }

        let status = wait_for_exit(&mut process, governor.as_ref()).await;
        // Read at exit: a deadline passing after a natural exit does not count.
        let timed_out = governor.as_ref().is_some_and(TimeoutGovernor::fired);
        if let Some(governor) = governor {
            governor.disarm().await;
        }

        drain(readers, &collector, self.config.drain_grace_duration()).await;
        let collected = collector.take().await;

        if let (true, Some(timeout)) = (timed_out, options.timeout) {
            tracing::warn!(?timeout, "codex timed out");
            return Err(CodexError::Timeout {
                timeout,
                stdout: collected.stdout.join("\n"),
                stderr: collected.stderr.join("\n"),
            });
        }

        let code = exit_code(status?);
        let result = ExecResult::from_collected(command, code, collected);
        tracing::debug!(
            exit_code = code,
            events = result.events.len(),
            "codex exited"
        );

        if code == SHELL_NOT_FOUND_EXIT && result.stderr.contains("not found") {
            return Err(CodexError::CommandNotFound {
                command: result.command,
            });
        }
        if code != 0 {
            return Err(CodexError::NonZeroExit {
                code,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }

    /// Run a call, retrying once without `--json` if the binary rejects it.
    ///
    /// Before the retry a synthetic stderr observation announces it. A
    /// failing retry is returned as is.
    ///
    /// # Errors
    ///
    /// Same as [`CodexClient::execute`].
    pub async fn execute_with_fallback(
        &self,
        prompt: &str,
        options: &ExecOptions,
        observer: Arc<dyn Observer>,
    ) -> Result<ExecResult> {
        match self.execute(prompt, options, Arc::clone(&observer)).await {
            Err(e) if options.json && e.is_json_flag_rejection() => {
                tracing::warn!("Installed codex rejected --json, retrying without it");
                observer.observe(Observation::Stderr(JSON_FALLBACK_NOTICE.to_string()));
                let mut retry = options.clone();
                retry.json = false;
                self.execute(prompt, &retry, observer).await
            }
            other => other,
        }
    }

    /// Run one turn of a conversation.
    ///
    /// With an active session and no explicit session id, the call resumes
    /// the most recent session; the command builder then drops the flags the
    /// CLI rejects on resume.
    ///
    /// # Errors
    ///
    /// Same as [`CodexClient::execute`].
    pub async fn send_turn(
        &self,
        prompt: &str,
        options: &ExecOptions,
        has_active_session: bool,
        observer: Arc<dyn Observer>,
    ) -> Result<ExecResult> {
        let mut options = options.clone();
        if has_active_session && options.resume_session_id.is_none() {
            options.resume_last = true;
        }
        self.execute_with_fallback(prompt, &options, observer).await
    }

    /// Run a fresh call and return only the final answer text.
    ///
    /// # Errors
    ///
    /// Same as [`CodexClient::execute`].
    pub async fn send_prompt(&self, prompt: &str, options: &ExecOptions) -> Result<String> {
        let result = self.execute_with_fallback(prompt, options, discard()).await?;
        Ok(result.final_message().to_string())
    }
}

/// Wait for exit, killing the child if the governor escalates.
async fn wait_for_exit(
    process: &mut CodexProcess,
    governor: Option<&TimeoutGovernor>,
) -> std::io::Result<ExitStatus> {
    let Some(governor) = governor else {
        return process.wait().await;
    };
    tokio::select! {
        status = process.wait() => status,
        () = governor.force_kill_requested() => {
            process.kill().await?;
            process.wait().await
        }
    }
}

/// Wait for the readers to reach EOF after exit.
///
/// A reader is only abandoned once a whole `grace` period passes without a
/// new line on either stream, e.g. a grandchild holding the pipe open.
async fn drain(readers: Vec<JoinHandle<()>>, collector: &Collector, grace: Duration) {
    for mut reader in readers {
        let mut seen = collector.line_count().await;
        loop {
            match tokio::time::timeout(grace, &mut reader).await {
                Ok(Ok(())) => break,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Stream reader failed");
                    break;
                }
                Err(_) => {
                    let now = collector.line_count().await;
                    if now == seen {
                        tracing::warn!(
                            lines = now,
                            ?grace,
                            "Stream idle after exit, abandoning reader"
                        );
                        reader.abort();
                        break;
                    }
                    seen = now;
                }
            }
        }
    }
}
