//! Codex Bridge - drive the Codex CLI (`codex exec`) as a subprocess.

pub mod binary;
pub mod cli;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod mcp;
pub mod session;

pub use client::CodexClient;
pub use error::{CodexError, Result};
pub use session::{Session, SessionState};
