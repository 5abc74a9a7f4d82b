//! Chat turn and history domain types.
//!
//! These are the value objects that flow through a session:
//! user types a turn → session appends it → transport sends the history →
//! assistant turn is committed once the reply is fully assembled.

use serde::{Deserialize, Serialize};

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// A local failure notice; rendered, never sent
    Error,
}

/// A single turn in a conversation. Serializes to the `{role, content}` wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Error,
            content: content.into(),
        }
    }

    /// Whether this turn may be stored in history and sent to the backend.
    pub fn is_persistable(&self) -> bool {
        self.role != Role::Error
    }
}

/// The ordered sequence of turns owned by one session.
///
/// Append-only except for [`History::truncate`], which the session uses to
/// roll back a failed submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    turns: Vec<ChatTurn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Error turns are refused and `false` is returned.
    pub fn push(&mut self, turn: ChatTurn) -> bool {
        if !turn.is_persistable() {
            tracing::trace!("Refusing to persist error turn");
            return false;
        }
        self.turns.push(turn);
        true
    }

    /// Replace the content of the turn at `index`, if it exists.
    pub fn set_content(&mut self, index: usize, content: impl Into<String>) -> bool {
        match self.turns.get_mut(index) {
            Some(turn) => {
                turn.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Drop every turn at or after `len`.
    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Request body for both `/api/chat` and `/api/chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
}

impl ChatRequest {
    /// Snapshot the persistable turns of a history.
    pub fn from_history(history: &History) -> Self {
        Self {
            messages: history
                .turns()
                .iter()
                .filter(|t| t.is_persistable())
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_turns_are_not_persisted() {
        let mut history = History::new();
        assert!(history.push(ChatTurn::user("Hello")));
        assert!(!history.push(ChatTurn::error("Error while sending message")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn truncate_rolls_back_tail() {
        let mut history = History::new();
        history.push(ChatTurn::user("one"));
        history.push(ChatTurn::assistant("two"));
        history.push(ChatTurn::user("three"));
        history.truncate(1);
        assert_eq!(history.turns(), &[ChatTurn::user("one")]);
    }

    #[test]
    fn set_content_replaces_placeholder() {
        let mut history = History::new();
        history.push(ChatTurn::user("Hello"));
        history.push(ChatTurn::assistant("Hi"));
        assert!(history.set_content(1, "Hi there"));
        assert!(!history.set_content(5, "nope"));
        assert_eq!(history.last().unwrap().content, "Hi there");
    }

    #[test]
    fn request_serializes_wire_shape() {
        let mut history = History::new();
        history.push(ChatTurn::user("Hello"));
        history.push(ChatTurn::assistant("Hi"));
        let json = serde_json::to_value(ChatRequest::from_history(&history)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messages": [
                    {"role": "user", "content": "Hello"},
                    {"role": "assistant", "content": "Hi"}
                ]
            })
        );
    }
}
