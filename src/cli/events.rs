//! Event types from `codex exec --json` output.
//!
//! Each stdout line in JSON mode is one event object. The top-level `type`
//! is kept as a string so new lifecycle events still decode; nested items are
//! a tagged union keyed on the item's own `type`.

use serde::{Deserialize, Deserializer, Serialize};

/// Token counters reported on `turn.completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default)]
    pub cached_input_tokens: Option<u64>,
}

impl Usage {
    /// Input plus output tokens, treating missing counters as zero.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens
            .unwrap_or(0)
            .saturating_add(self.output_tokens.unwrap_or(0))
    }
}

/// A single file touched by a `file_change` item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpdate {
    #[serde(default)]
    pub path: Option<String>,
    /// `add`, `delete` or `update`.
    #[serde(default)]
    pub kind: Option<String>,
}

/// One entry of a `todo_list` item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoEntry {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Item carried by `item.started` / `item.updated` / `item.completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadItem {
    /// Text reply from the agent.
    AgentMessage {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    /// Reasoning summary.
    Reasoning {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    /// Shell command run by the agent.
    CommandExecution {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        command: Option<String>,
        #[serde(default)]
        aggregated_output: Option<String>,
        #[serde(default)]
        exit_code: Option<i32>,
        #[serde(default)]
        status: Option<String>,
    },
    /// Patch applied to the workspace.
    FileChange {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        changes: Vec<FileUpdate>,
        #[serde(default)]
        status: Option<String>,
    },
    /// Call into an MCP tool server.
    McpToolCall {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        server: Option<String>,
        #[serde(default)]
        tool: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    WebSearch {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        query: Option<String>,
    },
    TodoList {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        items: Vec<TodoEntry>,
    },
    /// Non-fatal error reported as an item.
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// Catch-all for unknown item types.
    #[serde(other)]
    Unknown,
}

impl ThreadItem {
    /// Snake-case name of the item type.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentMessage { .. } => "agent_message",
            Self::Reasoning { .. } => "reasoning",
            Self::CommandExecution { .. } => "command_execution",
            Self::FileChange { .. } => "file_change",
            Self::McpToolCall { .. } => "mcp_tool_call",
            Self::WebSearch { .. } => "web_search",
            Self::TodoList { .. } => "todo_list",
            Self::Error { .. } => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Text of an agent message, if this is one.
    #[must_use]
    pub fn agent_text(&self) -> Option<&str> {
        match self {
            Self::AgentMessage { text, .. } => text.as_deref(),
            _ => None,
        }
    }
}

/// One decoded JSON line from stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEvent {
    /// Lifecycle tag, e.g. `thread.started` or `item.completed`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub item: Option<ThreadItem>,
    /// Error text. The wire value may be a string or `{"message": ...}`.
    #[serde(default, deserialize_with = "error_text")]
    pub error: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Original line, kept for diagnostics.
    #[serde(skip)]
    pub raw: String,
}

impl ThreadEvent {
    pub const THREAD_STARTED: &'static str = "thread.started";
    pub const TURN_STARTED: &'static str = "turn.started";
    pub const TURN_COMPLETED: &'static str = "turn.completed";
    pub const TURN_FAILED: &'static str = "turn.failed";
    pub const ITEM_COMPLETED: &'static str = "item.completed";

    /// Returns true for events that close a turn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind == Self::TURN_COMPLETED || self.kind == Self::TURN_FAILED
    }

    /// Agent message text carried by a completed item.
    #[must_use]
    pub fn agent_text(&self) -> Option<&str> {
        if self.kind != Self::ITEM_COMPLETED {
            return None;
        }
        self.item.as_ref().and_then(ThreadItem::agent_text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

fn error_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<ErrorField>::deserialize(deserializer)?;
    Ok(field.and_then(|f| match f {
        ErrorField::Text(text) => Some(text),
        ErrorField::Object { message } => message,
    }))
}
