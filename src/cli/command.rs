//! Command construction for `codex exec`.
//!
//! Options are mapped to an ordered list of shell tokens. Every
//! caller-supplied value is single-quoted; raw passthrough flags are the only
//! exception.

use std::borrow::Cow;
use std::path::Path;

use tempfile::TempPath;

use crate::cli::{ExecOptions, McpConfig, ResumeMode};
use crate::error::{CodexError, Result};
use crate::mcp;

/// Prompts longer than this are piped through stdin instead of argv.
pub const MAX_ARG_PROMPT_LEN: usize = 64 * 1024;

/// Token that tells the CLI to read the prompt from stdin.
pub const STDIN_PROMPT_TOKEN: &str = "-";

/// Flags the CLI rejects on `exec resume`.
pub const RESUME_REJECTED_FLAGS: [&str; 6] = [
    "--json",
    "--sandbox",
    "--model",
    "--full-auto",
    "--cd",
    "--mcp-config",
];

/// Quote a value for a POSIX shell.
///
/// The result is always wrapped in single quotes, and every embedded single
/// quote becomes `'\''`.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Decide whether the prompt should be delivered on stdin.
#[must_use]
pub fn prompt_via_stdin(prompt: &str, options: &ExecOptions) -> bool {
    options.prompt_via_stdin || prompt.len() > MAX_ARG_PROMPT_LEN
}

/// A fully built `codex exec` invocation.
///
/// Holds the temporary MCP config file, if one was written, so it outlives
/// the process that reads it.
#[derive(Debug)]
pub struct CommandPlan {
    prefix: Vec<String>,
    args: Vec<String>,
    via_stdin: bool,
    mcp_file: Option<TempPath>,
}

impl CommandPlan {
    /// Build the plan for a prompt.
    ///
    /// # Errors
    ///
    /// Returns `CodexError::InvalidConfig` if the MCP config cannot be
    /// validated or written.
    pub fn build(prompt: &str, options: &ExecOptions) -> Result<Self> {
        let via_stdin = prompt_via_stdin(prompt, options);
        let resume = options.resume_mode();
        let prefix = resume_prefix(resume);

        let mut args = Vec::new();
        let mut mcp_file = None;
        let resuming = resume.is_resume();

        for image in &options.images {
            args.push("--image".to_string());
            args.push(quote_path(image));
        }
        if let (false, Some(model)) = (resuming, &options.model) {
            args.push("--model".to_string());
            args.push(quote(model));
        }
        if let Some(approval) = options.approval {
            args.push("--config".to_string());
            args.push(quote(&format!("approval_policy={approval}")));
        }
        if let Some(profile) = &options.profile {
            args.push("--profile".to_string());
            args.push(quote(profile));
        }
        if options.oss {
            args.push("--oss".to_string());
        }
        if let (false, Some(sandbox)) = (resuming, options.sandbox) {
            args.push("--sandbox".to_string());
            args.push(quote(sandbox.as_str()));
        }
        if options.full_auto && !resuming {
            args.push("--full-auto".to_string());
        }
        if options.dangerously_bypass {
            args.push("--dangerously-bypass-approvals-and-sandbox".to_string());
        }
        if let (false, Some(dir)) = (resuming, &options.cd) {
            args.push("--cd".to_string());
            args.push(quote_path(dir));
        }
        for dir in &options.add_dirs {
            args.push("--add-dir".to_string());
            args.push(quote_path(dir));
        }
        if options.skip_git_repo_check {
            args.push("--skip-git-repo-check".to_string());
        }
        if options.search {
            args.push("--search".to_string());
        }
        for feature in &options.enable_features {
            args.push("--enable".to_string());
            args.push(quote(feature));
        }
        for feature in &options.disable_features {
            args.push("--disable".to_string());
            args.push(quote(feature));
        }
        for (key, value) in &options.config_overrides {
            args.push("--config".to_string());
            args.push(quote(&format!("{key}={value}")));
        }
        if let (false, Some(config)) = (resuming, &options.mcp) {
            let path: Cow<'_, Path> = match config {
                McpConfig::Path(path) => {
                    mcp::validate_path(path)?;
                    Cow::Borrowed(path.as_path())
                }
                McpConfig::Inline(servers) => {
                    let file = mcp::write_servers(servers)?;
                    let path = Cow::Owned(file.to_path_buf());
                    mcp_file = Some(file);
                    path
                }
            };
            args.push("--mcp-config".to_string());
            args.push(quote_path(&path));
        }
        if options.json && !resuming {
            args.push("--json".to_string());
        }
        if let Some(schema) = &options.output_schema {
            args.push("--output-schema".to_string());
            args.push(quote_path(schema));
        }
        if let Some(path) = &options.output_last_message {
            args.push("--output-last-message".to_string());
            args.push(quote_path(path));
        }
        if let Some(color) = options.color {
            args.push("--color".to_string());
            args.push(quote(color.as_str()));
        }
        args.extend(options.extra_flags.iter().cloned());

        if !prompt.is_empty() {
            if via_stdin {
                args.push(STDIN_PROMPT_TOKEN.to_string());
            } else {
                args.push(quote(prompt));
            }
        }

        Ok(Self {
            prefix,
            args,
            via_stdin,
            mcp_file,
        })
    }

    /// Tokens placed between `exec` and the flags.
    #[must_use]
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Flag tokens, already shell-quoted.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether the prompt is written to stdin.
    #[must_use]
    pub fn via_stdin(&self) -> bool {
        self.via_stdin
    }

    /// Path of the MCP config file written for this call, if any.
    #[must_use]
    pub fn mcp_file(&self) -> Option<&Path> {
        self.mcp_file.as_deref()
    }

    /// Assemble the command string run by the host shell.
    #[must_use]
    pub fn command_line(&self, executable: &str) -> String {
        let program = shell_escape::escape(Cow::Borrowed(executable));
        let mut line = format!("{program} exec");
        for token in self.prefix.iter().chain(&self.args) {
            line.push(' ');
            line.push_str(token);
        }
        line
    }
}

fn resume_prefix(mode: ResumeMode<'_>) -> Vec<String> {
    match mode {
        ResumeMode::Fresh => Vec::new(),
        ResumeMode::Last => vec!["resume".to_string(), "--last".to_string()],
        ResumeMode::Session(id) => vec!["resume".to_string(), quote(id)],
    }
}

/// Build only the argument list, discarding the plan.
///
/// # Errors
///
/// Same as [`CommandPlan::build`].
pub fn build_args(prompt: &str, options: &ExecOptions) -> Result<Vec<String>> {
    CommandPlan::build(prompt, options).map(|plan| plan.args)
}

/// Reject prompts that cannot be delivered.
///
/// # Errors
///
/// Returns `CodexError::PromptRequired` for an empty prompt with no stdin
/// delivery and no session to resume.
pub fn ensure_prompt(prompt: &str, options: &ExecOptions) -> Result<()> {
    if prompt.is_empty() && !options.prompt_via_stdin && !options.resume_mode().is_resume() {
        return Err(CodexError::PromptRequired);
    }
    Ok(())
}
