//! Conversation memory: bounded windows of recent exchanges, per session.
//!
//! Every chat session owns its own window. The memory backend is shared by
//! the whole process, so the session id is the only thing that keeps one
//! user's history out of another user's prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One completed human/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub human: String,
    pub ai: String,
}

impl Exchange {
    pub fn new(human: impl Into<String>, ai: impl Into<String>) -> Self {
        Self {
            human: human.into(),
            ai: ai.into(),
        }
    }
}

/// Render exchanges as a `Human:` / `AI:` transcript, oldest first.
pub fn render_transcript(exchanges: &[Exchange]) -> String {
    exchanges
        .iter()
        .map(|e| format!("Human: {}\nAI: {}", e.human, e.ai))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The conversation memory trait.
///
/// Implementations keep at most `window()` exchanges per session and return
/// them oldest first.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// How many exchanges a session keeps.
    fn window(&self) -> usize;

    /// Load the session's current window, oldest first.
    async fn load(&self, session: &SessionId) -> Vec<Exchange>;

    /// Record a completed exchange, evicting the oldest beyond the window.
    async fn save(&self, session: &SessionId, exchange: Exchange);

    /// Forget a session entirely.
    async fn clear(&self, session: &SessionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from("abc").to_string(), "abc");
    }

    #[test]
    fn transcript_rendering() {
        let exchanges = vec![
            Exchange::new("What is Git?", "A version control system."),
            Exchange::new("And GitHub?", "A hosting service."),
        ];
        assert_eq!(
            render_transcript(&exchanges),
            "Human: What is Git?\nAI: A version control system.\nHuman: And GitHub?\nAI: A hosting service."
        );
        assert_eq!(render_transcript(&[]), "");
    }
}
