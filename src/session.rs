//! Multi-turn conversations on top of [`CodexClient`].
//!
//! The first turn starts a fresh Codex session. Every later turn resumes the
//! most recent one, unless the caller pins a session id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cli::{ExecOptions, ExecResult, Observer};
use crate::client::CodexClient;
use crate::error::Result;

/// Whether a Codex session exists to resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Fresh,
    Active,
}

/// A conversation: a client, default options and the session state.
#[derive(Debug, Clone)]
pub struct Session {
    client: CodexClient,
    defaults: ExecOptions,
    state: SessionState,
    turns: usize,
    thread_id: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(client: CodexClient) -> Self {
        Self::with_defaults(client, ExecOptions::default())
    }

    /// Start a session whose turns use `defaults` unless overridden.
    #[must_use]
    pub fn with_defaults(client: CodexClient, defaults: ExecOptions) -> Self {
        Self {
            client,
            defaults,
            state: SessionState::Fresh,
            turns: 0,
            thread_id: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Completed turns since the last reset.
    #[must_use]
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Thread id reported by the most recent JSON turn, if any.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    #[must_use]
    pub fn defaults(&self) -> &ExecOptions {
        &self.defaults
    }

    /// Forget the session; the next turn starts fresh.
    pub fn reset(&mut self) {
        self.transition(SessionState::Fresh);
        self.turns = 0;
        self.thread_id = None;
    }

    /// Send a turn with the session defaults.
    ///
    /// # Errors
    ///
    /// Propagates the client error. A failed turn leaves the state unchanged.
    pub async fn send(&mut self, prompt: &str, observer: Arc<dyn Observer>) -> Result<ExecResult> {
        let options = self.defaults.clone();
        self.send_with(prompt, &options, observer).await
    }

    /// Send a turn with explicit options.
    ///
    /// # Errors
    ///
    /// Propagates the client error. A failed turn leaves the state unchanged.
    pub async fn send_with(
        &mut self,
        prompt: &str,
        options: &ExecOptions,
        observer: Arc<dyn Observer>,
    ) -> Result<ExecResult> {
        let result = self
            .client
            .send_turn(prompt, options, self.is_active(), observer)
            .await?;

        self.turns = self.turns.saturating_add(1);
        if let Some(id) = result.thread_id() {
            self.thread_id = Some(id.to_string());
        }
        if !self.is_active() {
            self.transition(SessionState::Active);
        }
        Ok(result)
    }

    fn transition(&mut self, new_state: SessionState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "Session transition");
        self.state = new_state;
    }
}
