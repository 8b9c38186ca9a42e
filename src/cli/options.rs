//! Per-call invocation options for `codex exec`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Filesystem/execution restriction level granted to the agent for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl SandboxMode {
    /// Wire name used on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

impl fmt::Display for SandboxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the agent asks before running commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalPolicy {
    Untrusted,
    OnFailure,
    OnRequest,
    Never,
}

impl ApprovalPolicy {
    /// Wire name used in the `approval_policy` config override.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Untrusted => "untrusted",
            Self::OnFailure => "on-failure",
            Self::OnRequest => "on-request",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ApprovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ANSI color handling requested from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Always,
    Never,
    Auto,
}

impl ColorMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::Auto => "auto",
        }
    }
}

/// One auxiliary tool server the agent may call into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    /// Executable for stdio servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Endpoint for HTTP servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl McpServer {
    /// Create a stdio server descriptor.
    #[must_use]
    pub fn stdio(command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: Some(command.into()),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            ..Default::default()
        }
    }

    /// Create an HTTP server descriptor.
    #[must_use]
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// MCP configuration for a call: an existing file, or servers to write out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpConfig {
    Path(PathBuf),
    Inline(BTreeMap<String, McpServer>),
}

/// Which session an invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode<'a> {
    Fresh,
    Last,
    Session(&'a str),
}

impl ResumeMode<'_> {
    #[must_use]
    pub fn is_resume(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Options for a single `codex exec` invocation.
///
/// Values are plain data; the command builder decides which of them are sent
/// for a given resume mode.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub model: Option<String>,
    pub profile: Option<String>,
    pub sandbox: Option<SandboxMode>,
    pub approval: Option<ApprovalPolicy>,
    pub full_auto: bool,
    pub dangerously_bypass: bool,
    /// Working-directory override passed as `--cd`.
    pub cd: Option<PathBuf>,
    pub add_dirs: Vec<PathBuf>,
    /// Select the local open-source model backend.
    pub oss: bool,
    pub skip_git_repo_check: bool,
    pub search: bool,
    pub enable_features: Vec<String>,
    pub disable_features: Vec<String>,
    /// Arbitrary `key=value` overrides. Iteration order is unspecified.
    pub config_overrides: HashMap<String, String>,
    pub json: bool,
    pub output_schema: Option<PathBuf>,
    pub output_last_message: Option<PathBuf>,
    pub color: Option<ColorMode>,
    pub images: Vec<PathBuf>,
    pub resume_session_id: Option<String>,
    pub resume_last: bool,
    pub prompt_via_stdin: bool,
    pub timeout: Option<Duration>,
    /// Raw flags appended verbatim, without escaping.
    pub extra_flags: Vec<String>,
    pub mcp: Option<McpConfig>,
}

impl ExecOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the resume mode. A session id wins over resume-last.
    #[must_use]
    pub fn resume_mode(&self) -> ResumeMode<'_> {
        match (&self.resume_session_id, self.resume_last) {
            (Some(id), _) => ResumeMode::Session(id),
            (None, true) => ResumeMode::Last,
            (None, false) => ResumeMode::Fresh,
        }
    }

    /// Whether JSON events are expected on stdout for this call.
    ///
    /// `--json` is never sent on resume, so stdout is plain text there.
    #[must_use]
    pub fn json_effective(&self) -> bool {
        self.json && !self.resume_mode().is_resume()
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    #[must_use]
    pub fn sandbox(mut self, sandbox: SandboxMode) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    #[must_use]
    pub fn approval(mut self, approval: ApprovalPolicy) -> Self {
        self.approval = Some(approval);
        self
    }

    #[must_use]
    pub fn full_auto(mut self, enabled: bool) -> Self {
        self.full_auto = enabled;
        self
    }

    #[must_use]
    pub fn dangerously_bypass(mut self, enabled: bool) -> Self {
        self.dangerously_bypass = enabled;
        self
    }

    #[must_use]
    pub fn cd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cd = Some(dir.into());
        self
    }

    #[must_use]
    pub fn add_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.add_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn oss(mut self, enabled: bool) -> Self {
        self.oss = enabled;
        self
    }

    #[must_use]
    pub fn skip_git_repo_check(mut self, enabled: bool) -> Self {
        self.skip_git_repo_check = enabled;
        self
    }

    #[must_use]
    pub fn search(mut self, enabled: bool) -> Self {
        self.search = enabled;
        self
    }

    #[must_use]
    pub fn enable_feature(mut self, feature: impl Into<String>) -> Self {
        self.enable_features.push(feature.into());
        self
    }

    #[must_use]
    pub fn disable_feature(mut self, feature: impl Into<String>) -> Self {
        self.disable_features.push(feature.into());
        self
    }

    #[must_use]
    pub fn config_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_overrides.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    #[must_use]
    pub fn output_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_schema = Some(path.into());
        self
    }

    #[must_use]
    pub fn output_last_message(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_last_message = Some(path.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: ColorMode) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }

    /// Resume a specific session. Clears resume-last.
    #[must_use]
    pub fn resume_session(mut self, id: impl Into<String>) -> Self {
        self.resume_session_id = Some(id.into());
        self.resume_last = false;
        self
    }

    /// Resume the most recent session. Clears any session id.
    #[must_use]
    pub fn resume_last(mut self) -> Self {
        self.resume_session_id = None;
        self.resume_last = true;
        self
    }

    #[must_use]
    pub fn prompt_via_stdin(mut self, enabled: bool) -> Self {
        self.prompt_via_stdin = enabled;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn extra_flag(mut self, flag: impl Into<String>) -> Self {
        self.extra_flags.push(flag.into());
        self
    }

    /// Use an existing MCP config file. Replaces any inline servers.
    #[must_use]
    pub fn mcp_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mcp = Some(McpConfig::Path(path.into()));
        self
    }

    /// Add an inline MCP server. Ignored if a config file path is already set.
    #[must_use]
    pub fn mcp_server(mut self, name: impl Into<String>, server: McpServer) -> Self {
        match &mut self.mcp {
            Some(McpConfig::Path(_)) => {}
            Some(McpConfig::Inline(servers)) => {
                servers.insert(name.into(), server);
            }
            None => {
                self.mcp = Some(McpConfig::Inline(BTreeMap::from([(name.into(), server)])));
            }
        }
        self
    }
}
