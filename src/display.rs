//! Colored terminal output for the `codex-bridge` binary.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::cli::{ExecResult, Observation, ThreadEvent, ThreadItem};
use crate::error::CodexError;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to `max_len` characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// One-line summary of an item, or `None` for items not worth showing.
#[must_use]
pub fn describe_item(item: &ThreadItem, raw_mode: bool) -> Option<String> {
    let text = match item {
        ThreadItem::AgentMessage { .. } | ThreadItem::Unknown => return None,
        ThreadItem::Reasoning { text, .. } => {
            truncate(text.as_deref().unwrap_or_default(), DEFAULT_MAX_LEN, raw_mode)
        }
        ThreadItem::CommandExecution {
            command, exit_code, ..
        } => {
            let command = truncate(command.as_deref().unwrap_or_default(), 60, raw_mode);
            match exit_code {
                Some(code) => format!("{command} (exit {code})"),
                None => command,
            }
        }
        ThreadItem::FileChange { changes, .. } => changes
            .iter()
            .map(|c| {
                let path = c.path.as_deref().unwrap_or("?");
                match &c.kind {
                    Some(kind) => format!("{kind} {path}"),
                    None => path.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
        ThreadItem::McpToolCall { server, tool, .. } => format!(
            "{}/{}",
            server.as_deref().unwrap_or("?"),
            tool.as_deref().unwrap_or("?")
        ),
        ThreadItem::WebSearch { query, .. } => {
            truncate(query.as_deref().unwrap_or_default(), DEFAULT_MAX_LEN, raw_mode)
        }
        ThreadItem::TodoList { items, .. } => {
            let done = items.iter().filter(|i| i.completed).count();
            format!("{done}/{} done", items.len())
        }
        ThreadItem::Error { message, .. } => message.clone().unwrap_or_default(),
    };
    Some(text)
}

/// One-line summary of a turn lifecycle event.
#[must_use]
pub fn describe_turn(event: &ThreadEvent) -> Option<String> {
    match event.kind.as_str() {
        ThreadEvent::TURN_STARTED => Some("Turn started".to_string()),
        ThreadEvent::TURN_COMPLETED => {
            let tokens = event.usage.map_or(0, |u| u.total_tokens());
            Some(format!("Turn completed (tokens: {tokens})"))
        }
        ThreadEvent::TURN_FAILED => {
            Some(event.error.as_deref().unwrap_or("Turn failed").to_string())
        }
        _ => None,
    }
}

fn print_event(event: &ThreadEvent, raw_mode: bool) {
    let ts = timestamp();
    match event.kind.as_str() {
        ThreadEvent::THREAD_STARTED => println!(
            "{} {} thread={}",
            ts.dimmed(),
            "[THREAD]".blue().bold(),
            truncate(event.thread_id.as_deref().unwrap_or("?"), 40, raw_mode).dimmed()
        ),
        ThreadEvent::TURN_STARTED => {
            if let Some(summary) = describe_turn(event) {
                println!("{} {} {}", ts.dimmed(), "[TURN]".blue().bold(), summary.dimmed());
            }
        }
        ThreadEvent::TURN_COMPLETED => {
            if let Some(summary) = describe_turn(event) {
                println!("{} {} {}", ts.dimmed(), "[TURN]".blue().bold(), summary);
            }
        }
        ThreadEvent::TURN_FAILED => {
            if let Some(summary) = describe_turn(event) {
                println!("{} {} {}", ts.dimmed(), "[TURN]".red().bold(), summary.red());
            }
        }
        ThreadEvent::ITEM_COMPLETED => {
            let Some(item) = &event.item else { return };
            if let Some(summary) = describe_item(item, raw_mode) {
                println!(
                    "{} {} {}",
                    ts.dimmed(),
                    format!("[{}]", item.kind().to_uppercase()).cyan().bold(),
                    summary
                );
            }
        }
        _ => {}
    }
}

/// Print one observation as it arrives.
pub fn print_observation(observation: &Observation, raw_mode: bool) {
    match observation {
        Observation::Stdout(line) => println!("{line}"),
        Observation::Stderr(line) => eprintln!("{}", line.dimmed()),
        Observation::Event(event) => print_event(event, raw_mode),
    }
    let _ = io::stdout().flush();
}

/// Print the final answer of a call.
pub fn print_final(result: &ExecResult) {
    println!("{}", result.final_message());
    if let Some(usage) = result.usage() {
        println!(
            "{} {} tokens={} {}",
            timestamp().dimmed(),
            "[DONE]".green().bold(),
            usage.total_tokens(),
            result
                .thread_id()
                .map_or(String::new(), |id| format!("thread={id}"))
                .dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print a failed call: a labeled message, then any partial output.
pub fn print_error(err: &CodexError) {
    eprintln!("{} {} {}", timestamp().dimmed(), error_label(err).red().bold(), err);
    if let Some(output) = err.partial_output() {
        eprintln!("{}", output.dimmed());
    }
}

/// Tag shown in front of an error.
#[must_use]
pub fn error_label(err: &CodexError) -> &'static str {
    if err.is_input_error() {
        "[INPUT]"
    } else if matches!(err, CodexError::Timeout { .. }) {
        "[TIMEOUT]"
    } else {
        "[ERROR]"
    }
}

/// Print the outcome of binary discovery.
pub fn print_probe(executable: &str, version: &str) {
    println!(
        "{} {} {} version={}",
        timestamp().dimmed(),
        "[CODEX]".blue().bold(),
        executable.bold(),
        version.cyan()
    );
    let _ = io::stdout().flush();
}
