//! Codex process spawning and control.
//!
//! The built command string runs under a host shell so that login profiles
//! and PATH tweaks apply the way they would in a terminal.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::config::ProcessConfig;
use crate::error::CodexError;

/// Exit status a POSIX shell reports when the command does not exist.
pub const SHELL_NOT_FOUND_EXIT: i32 = 127;

/// Compute the environment overrides for a launch.
///
/// Extra PATH entries go in front of the inherited PATH so they win lookups;
/// explicit overrides are applied last and may replace PATH entirely.
#[must_use]
pub fn launch_env(
    inherited_path: Option<OsString>,
    extra_paths: &[PathBuf],
    overrides: &HashMap<String, String>,
) -> Vec<(OsString, OsString)> {
    let mut env = Vec::new();

    if !extra_paths.is_empty() {
        let mut entries: Vec<PathBuf> = extra_paths.to_vec();
        if let Some(path) = &inherited_path {
            entries.extend(std::env::split_paths(path));
        }
        match std::env::join_paths(entries) {
            Ok(joined) => env.push((OsString::from("PATH"), joined)),
            Err(e) => tracing::warn!(error = %e, "Ignoring extra PATH entries"),
        }
    }

    for (key, value) in overrides {
        env.push((OsString::from(key), OsString::from(value)));
    }
    env
}

/// A running Codex process hosted by a shell.
#[derive(Debug)]
pub struct CodexProcess {
    child: Child,
    command: String,
}

impl CodexProcess {
    /// Spawn `<shell> [-l] -c <command>` with the given configuration.
    ///
    /// Stdin is piped only when `pipe_stdin` is set; feed it with
    /// [`CodexProcess::send_prompt`] once the output readers are running.
    ///
    /// # Errors
    ///
    /// Returns `CodexError::CommandNotFound` if the shell cannot be found and
    /// `CodexError::LaunchFailed` for any other spawn failure.
    pub fn spawn(
        config: &ProcessConfig,
        command: String,
        pipe_stdin: bool,
    ) -> Result<Self, CodexError> {
        let mut cmd = Command::new(&config.shell);
        if config.login_shell {
            cmd.arg("-l");
        }
        cmd.arg("-c")
            .arg(&command)
            .stdin(if pipe_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(launch_env(
            std::env::var_os("PATH"),
            &config.extra_paths,
            &config.env,
        ));

        // Own process group, so signals reach the tool and not just the shell.
        #[cfg(unix)]
        cmd.process_group(0);

        if config.debug {
            tracing::debug!(shell = %config.shell.display(), %command, "Spawning process");
        }

        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CodexError::CommandNotFound {
                command: command.clone(),
            },
            _ => CodexError::LaunchFailed(e.to_string()),
        })?;

        Ok(Self { child, command })
    }

    /// Write the prompt to stdin and close it.
    ///
    /// Does nothing if stdin was not piped or was already used. A write
    /// failure means the tool already exited, so it is logged and left for
    /// the exit status to explain.
    pub async fn send_prompt(&mut self, prompt: &str) {
        let Some(mut stdin) = self.child.stdin.take() else {
            return;
        };
        let written = match stdin.write_all(prompt.as_bytes()).await {
            Ok(()) => stdin.shutdown().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to write prompt to stdin");
        }
    }

    /// The command string passed to the shell.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process has exited without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Forcefully kill the process. Safe to call after it exited.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill().await
    }
}

/// Exit code of a finished process.
///
/// Signal deaths map to `128 + signal`, the shell convention.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
