//! Exchange-scoped chat session state.
//!
//! The session is an explicit value owned by the caller: the ordered
//! conversation history plus a busy flag that serializes exchanges. The
//! demuxer and accumulator hold exchange-scoped state with no isolation
//! between concurrent runs, so exactly one exchange may be in flight per
//! session.

use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

/// Conversation history and exchange bookkeeping for one chat session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSession {
    /// Conversation turns, oldest first
    history: Vec<ChatMessage>,
    /// Whether an exchange is currently in flight
    busy: bool,
}

impl ChatSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session seeded with a system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            history: vec![ChatMessage::system(prompt)],
            busy: false,
        }
    }

    /// The conversation so far, oldest turn first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Whether an exchange is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Start an exchange: record the user turn and mark the session busy.
    ///
    /// Returns `false` without touching the history when an exchange is
    /// already in flight; the caller must reject or queue the message.
    pub fn begin_exchange(&mut self, user_text: impl Into<String>) -> bool {
        if self.busy {
            return false;
        }
        self.history.push(ChatMessage::user(user_text));
        self.busy = true;
        true
    }

    /// Finish the in-flight exchange with the assistant's full response.
    pub fn complete_exchange(&mut self, assistant_text: impl Into<String>) {
        self.history.push(ChatMessage::assistant(assistant_text));
        self.busy = false;
    }

    /// Release the busy flag without recording an assistant turn.
    ///
    /// Used on error and cancellation paths; any partially accumulated
    /// response is discarded. The user turn stays in the history.
    pub fn abort_exchange(&mut self) {
        self.busy = false;
    }

    /// Drop all history and return to idle.
    pub fn reset(&mut self) {
        self.history.clear();
        self.busy = false;
    }
}
