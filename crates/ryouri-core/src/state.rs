//! UI-agnostic conversation state
//!
//! The transcript is shared by every front end (TUI, one-shot CLI) and does
//! not depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// A single entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: ChatRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a turn's author, serialized the way the Messages API expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// Ordered transcript of the session.
///
/// Always starts with the assistant greeting and only ever grows; consumers
/// get a read-only slice.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create a conversation holding only `greeting`
    pub fn seeded(greeting: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::assistant(greeting)],
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Install a full transcript computed from the current one
    pub fn replace_all(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// True while nothing but the greeting has been exchanged
    pub fn is_seed_only(&self) -> bool {
        self.turns.len() == 1
    }
}
