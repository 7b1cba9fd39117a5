//! Turn-level streaming events.
//!
//! `AgentStreamEvent` wraps provider stream chunks and agent steps into
//! events a front end can render while a turn is still running.

use gitbuddy_core::provider::Usage;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted while a turn is answered.
///
/// - `chunk`: partial answer text
/// - `sources`: supplemental links found for the answer
/// - `thought`: raw ReAct step output
/// - `tool_call`: agent is invoking a tool
/// - `tool_result`: tool execution completed
/// - `done`: the turn is complete
/// - `error`: the turn failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial answer text.
    Chunk { content: String },

    /// Links offered alongside the answer.
    Sources { links: Vec<String> },

    /// A reasoning step (ReAct trace).
    Thought { content: String },

    /// The agent is calling a tool.
    ToolCall {
        id: String,
        name: String,
        input: String,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
    },

    /// The turn is complete.
    Done {
        session_id: String,
        usage: Option<Usage>,
        iterations: usize,
        tool_calls_made: usize,
    },

    /// The turn failed.
    Error { message: String },
}

impl AgentStreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Sources { .. } => "sources",
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Where a turn's events go.
///
/// A sink without a receiver, or whose receiver has gone away, drops
/// events silently; the turn itself never fails because nobody listens.
#[derive(Debug, Clone, Default)]
pub struct TurnSink {
    tx: Option<mpsc::Sender<AgentStreamEvent>>,
}

impl TurnSink {
    pub fn new(tx: mpsc::Sender<AgentStreamEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink paired with its receiving end.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<AgentStreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// A sink that discards everything.
    pub fn discard() -> Self {
        Self::default()
    }

    pub async fn send(&self, event: AgentStreamEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_chunk() {
        let event = AgentStreamEvent::Chunk {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_sources() {
        let event = AgentStreamEvent::Sources {
            links: vec!["https://git-scm.com/book".into()],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"sources""#));
        assert!(json.contains("git-scm.com/book"));
    }

    #[test]
    fn event_round_trip_tool_call() {
        let event = AgentStreamEvent::ToolCall {
            id: "call_1".into(),
            name: "Search Git".into(),
            input: "git stash".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: AgentStreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.event_type(), "tool_call");
    }

    #[test]
    fn event_types_are_snake_case() {
        let done = AgentStreamEvent::Done {
            session_id: "s".into(),
            usage: None,
            iterations: 1,
            tool_calls_made: 0,
        };
        assert_eq!(done.event_type(), "done");
        let json = serde_json::to_string(&AgentStreamEvent::ToolResult {
            id: "1".into(),
            name: "n".into(),
            output: "o".into(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"tool_result""#));
    }

    #[tokio::test]
    async fn sink_delivers_in_order() {
        let (sink, mut rx) = TurnSink::channel(8);
        sink.send(AgentStreamEvent::Chunk { content: "a".into() }).await;
        sink.send(AgentStreamEvent::Chunk { content: "b".into() }).await;
        drop(sink);

        let mut got = Vec::new();
        while let Some(AgentStreamEvent::Chunk { content }) = rx.recv().await {
            got.push(content);
        }
        assert_eq!(got, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn closed_or_missing_receiver_is_ignored() {
        let (sink, rx) = TurnSink::channel(1);
        drop(rx);
        sink.send(AgentStreamEvent::Thought { content: "x".into() }).await;
        TurnSink::discard()
            .send(AgentStreamEvent::Thought { content: "y".into() })
            .await;
    }
}
