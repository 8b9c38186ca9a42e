//! Error taxonomy for Codex invocations.

use std::time::Duration;

/// Substring the Codex CLI prints when the installed build does not know `--json`.
pub const JSON_FLAG_REJECTED: &str = "unexpected argument '--json'";

/// Errors surfaced by a Codex invocation.
///
/// Input and configuration errors are raised before a process is spawned.
/// Exit and timeout errors are only raised after the process has exited and
/// both output streams have drained, and they carry whatever output was
/// captured up to that point.
#[derive(thiserror::Error, Debug)]
pub enum CodexError {
    /// Empty prompt with no stdin delivery and no session to resume.
    #[error("A prompt is required")]
    PromptRequired,

    /// The executable could not be found.
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },

    /// The host shell could not be launched.
    #[error("Failed to launch process: {0}")]
    LaunchFailed(String),

    /// The process exited with a non-zero status.
    #[error("Process exited with code {code}: {}", .stderr.trim())]
    NonZeroExit {
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// The configured time budget elapsed before the process finished.
    #[error("Timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    /// Options could not be turned into a valid invocation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error while supervising the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CodexError>;

impl CodexError {
    /// Output captured before the failure, preferring stdout over stderr.
    #[must_use]
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { stdout, stderr, .. } | Self::Timeout { stdout, stderr, .. } => {
                [stdout.trim(), stderr.trim()]
                    .into_iter()
                    .find(|s| !s.is_empty())
            }
            _ => None,
        }
    }

    /// Returns true if the installed binary rejected the `--json` flag.
    #[must_use]
    pub fn is_json_flag_rejection(&self) -> bool {
        matches!(self, Self::NonZeroExit { stderr, .. } if stderr.contains(JSON_FLAG_REJECTED))
    }

    /// Returns true for errors detected before any process was spawned.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::PromptRequired | Self::InvalidConfig(_))
    }
}
