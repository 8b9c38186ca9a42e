//! MCP config files handed to the CLI.
//!
//! Inline server maps and raw JSON text are validated and written to a fresh
//! temporary file. The returned [`TempPath`] removes the file when dropped, so
//! callers keep it alive for as long as the process that reads it.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempPath;

use crate::cli::McpServer;
use crate::error::{CodexError, Result};

/// Top-level key of the written document.
pub const MCP_SERVERS_KEY: &str = "mcpServers";

/// Serialize servers to the canonical document written to disk.
///
/// # Errors
///
/// Returns `CodexError::InvalidConfig` if the map is empty or cannot be serialized.
pub fn render_servers(servers: &BTreeMap<String, McpServer>) -> Result<String> {
    if servers.is_empty() {
        return Err(CodexError::InvalidConfig(
            "MCP server map is empty".to_string(),
        ));
    }
    let document = json!({ MCP_SERVERS_KEY: servers });
    serde_json::to_string_pretty(&document)
        .map_err(|e| CodexError::InvalidConfig(format!("Failed to serialize MCP config: {e}")))
}

/// Write inline servers to a temporary config file.
///
/// # Errors
///
/// Returns `CodexError::InvalidConfig` if serialization or the write fails.
pub fn write_servers(servers: &BTreeMap<String, McpServer>) -> Result<TempPath> {
    let body = render_servers(servers)?;
    write_temp(&body)
}

/// Validate raw JSON text and write it to a temporary config file.
///
/// Bare server maps are wrapped under `mcpServers`; documents that already
/// have the key are written as given.
///
/// # Errors
///
/// Returns `CodexError::InvalidConfig` if the text is empty, is not a JSON
/// object, or cannot be written.
pub fn write_raw_json(text: &str) -> Result<TempPath> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CodexError::InvalidConfig(
            "MCP config JSON is empty".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| CodexError::InvalidConfig(format!("MCP config is not valid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(CodexError::InvalidConfig(
            "MCP config must be a JSON object".to_string(),
        ));
    };
    if map.is_empty() {
        return Err(CodexError::InvalidConfig(
            "MCP config JSON is empty".to_string(),
        ));
    }

    let document = if map.contains_key(MCP_SERVERS_KEY) {
        Value::Object(map)
    } else {
        json!({ MCP_SERVERS_KEY: map })
    };
    let body = serde_json::to_string_pretty(&document)
        .map_err(|e| CodexError::InvalidConfig(format!("Failed to serialize MCP config: {e}")))?;
    write_temp(&body)
}

/// Reject an empty config path.
///
/// # Errors
///
/// Returns `CodexError::InvalidConfig` for an empty path.
pub fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(CodexError::InvalidConfig(
            "MCP config path is empty".to_string(),
        ));
    }
    Ok(())
}

fn write_temp(body: &str) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("codex-mcp-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| CodexError::InvalidConfig(format!("Failed to create MCP config file: {e}")))?;
    file.write_all(body.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| CodexError::InvalidConfig(format!("Failed to write MCP config file: {e}")))?;
    tracing::debug!(path = %file.path().display(), "Wrote MCP config");
    Ok(file.into_temp_path())
}
