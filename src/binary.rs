//! Locating the Codex executable.
//!
//! Discovery is a collaborator of the client: it supplies a resolved path and
//! version, or nothing, in which case the client runs the bare executable
//! name through PATH and reports the version as unknown.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::config::DEFAULT_EXECUTABLE;

/// Reported version when no probe succeeded.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Upper bound for a single `--version` probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A binary whose version was confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinary {
    pub executable_path: PathBuf,
    pub version: String,
}

/// Outcome of binary discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryStatus {
    Resolved(ResolvedBinary),
    /// Nothing confirmed; rely on PATH lookup of the bare name.
    PathFallback { name: String },
}

impl BinaryStatus {
    /// Build a status from an optional resolution.
    #[must_use]
    pub fn from_resolution(resolved: Option<ResolvedBinary>) -> Self {
        resolved.map_or_else(
            || Self::PathFallback {
                name: DEFAULT_EXECUTABLE.to_string(),
            },
            Self::Resolved,
        )
    }

    /// Executable to place at the head of the command string.
    #[must_use]
    pub fn executable(&self) -> String {
        match self {
            Self::Resolved(binary) => binary.executable_path.to_string_lossy().into_owned(),
            Self::PathFallback { name } => name.clone(),
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::Resolved(binary) => &binary.version,
            Self::PathFallback { .. } => UNKNOWN_VERSION,
        }
    }
}

/// Supplies the executable to run.
#[async_trait]
pub trait BinaryResolver: Send + Sync {
    async fn resolve(&self) -> Option<ResolvedBinary>;
}

/// Pull the first `x.y.z` version out of `--version` output.
#[must_use]
pub fn parse_version(output: &str) -> Option<String> {
    static VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    VERSION
        .get_or_init(|| Regex::new(r"\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.-]+)?").ok())
        .as_ref()?
        .find(output)
        .map(|m| m.as_str().to_string())
}

/// Resolver that runs `<candidate> --version` on each candidate in turn.
#[derive(Debug, Clone)]
pub struct VersionProbe {
    candidates: Vec<PathBuf>,
}

impl VersionProbe {
    #[must_use]
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Common install locations, then the bare name.
    #[must_use]
    pub fn default_candidates() -> Self {
        let mut candidates = Vec::new();
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".local").join("bin").join(DEFAULT_EXECUTABLE));
            candidates.push(home.join(".cargo").join("bin").join(DEFAULT_EXECUTABLE));
        }
        candidates.push(PathBuf::from("/opt/homebrew/bin").join(DEFAULT_EXECUTABLE));
        candidates.push(PathBuf::from("/usr/local/bin").join(DEFAULT_EXECUTABLE));
        candidates.push(PathBuf::from(DEFAULT_EXECUTABLE));
        Self { candidates }
    }

    async fn probe(candidate: &PathBuf) -> Option<String> {
        let output = Command::new(candidate)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = match tokio::time::timeout(PROBE_TIMEOUT, output).await {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(_)) => {
                tracing::debug!(candidate = %candidate.display(), "--version returned non-zero exit code");
                return None;
            }
            Ok(Err(e)) => {
                tracing::debug!(candidate = %candidate.display(), error = %e, "Version probe failed");
                return None;
            }
            Err(_) => {
                tracing::debug!(candidate = %candidate.display(), "Version probe timed out");
                return None;
            }
        };
        parse_version(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl BinaryResolver for VersionProbe {
    async fn resolve(&self) -> Option<ResolvedBinary> {
        for candidate in &self.candidates {
            if let Some(version) = Self::probe(candidate).await {
                tracing::debug!(path = %candidate.display(), %version, "Resolved codex binary");
                return Some(ResolvedBinary {
                    executable_path: candidate.clone(),
                    version,
                });
            }
        }
        tracing::warn!("No codex binary confirmed, falling back to PATH lookup");
        None
    }
}
