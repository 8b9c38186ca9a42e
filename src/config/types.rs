//! Configuration types.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::binary::BinaryStatus;
use crate::cli::{ExecOptions, SandboxMode};

/// Executable looked up on PATH when nothing else is configured.
pub const DEFAULT_EXECUTABLE: &str = "codex";

/// How the Codex process is hosted. Set once per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Executable path or name.
    pub executable: String,
    /// Shell used to run the command string.
    pub shell: PathBuf,
    /// Pass `-l` to the shell so login profiles are sourced.
    pub login_shell: bool,
    pub working_dir: Option<PathBuf>,
    /// Prepended to the inherited PATH.
    pub extra_paths: Vec<PathBuf>,
    /// Environment overrides, applied last.
    pub env: HashMap<String, String>,
    /// Log undecodable JSON lines and spawn details.
    pub debug: bool,
    /// Time between SIGTERM and SIGKILL after a timeout.
    pub terminate_grace_ms: u64,
    /// Time allowed for output readers to drain after exit.
    pub drain_grace_ms: u64,
}

fn default_shell() -> PathBuf {
    std::env::var_os("SHELL").map_or_else(|| PathBuf::from("/bin/sh"), PathBuf::from)
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            shell: default_shell(),
            login_shell: true,
            working_dir: None,
            extra_paths: Vec::new(),
            env: HashMap::new(),
            debug: false,
            terminate_grace_ms: 2_000,
            drain_grace_ms: 250,
        }
    }
}

impl ProcessConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    #[must_use]
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    #[must_use]
    pub fn login_shell(mut self, enabled: bool) -> Self {
        self.login_shell = enabled;
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn extra_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_paths.push(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    #[must_use]
    pub fn terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Use a resolved binary, or fall back to PATH lookup.
    #[must_use]
    pub fn with_binary(mut self, status: &BinaryStatus) -> Self {
        self.executable = status.executable();
        self
    }

    #[must_use]
    pub fn terminate_grace_duration(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    #[must_use]
    pub fn drain_grace_duration(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

/// Default per-call options read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub model: Option<String>,
    pub sandbox: Option<SandboxMode>,
    pub json: bool,
    pub timeout_secs: Option<u64>,
    pub skip_git_repo_check: bool,
}

impl DefaultsConfig {
    /// Starting options for a call.
    #[must_use]
    pub fn to_options(&self) -> ExecOptions {
        let mut options = ExecOptions::new()
            .json(self.json)
            .skip_git_repo_check(self.skip_git_repo_check);
        options.model.clone_from(&self.model);
        options.sandbox = self.sandbox;
        options.timeout = self.timeout_secs.map(Duration::from_secs);
        options
    }
}

/// Contents of a `codex-bridge` config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub process: ProcessConfig,
    pub defaults: DefaultsConfig,
}
