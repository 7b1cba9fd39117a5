//! Conversational Shell: the turn-by-turn chat session.
//!
//! Holds the visible transcript, rejects questions that are too short or
//! too long without contacting anything, and hands the rest to a
//! [`Responder`].

use async_trait::async_trait;
use gitbuddy_config::ShellConfig;
use gitbuddy_core::error::Result;
use gitbuddy_core::memory::SessionId;
use gitbuddy_core::message::Role;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::stream_event::{AgentStreamEvent, TurnSink};

pub const GREETING: &str = "Ask me a question about Git, GitHub, or TortoiseGit!";
pub const TOO_LONG: &str = "Your question is too long. Please reword it with less words.";
pub const TOO_SHORT: &str = "Please ask a question with more words.";

/// Anything that can answer a question for a session.
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    /// Answer `query`, streaming partial output into `sink`.
    async fn respond(&self, session: &SessionId, query: &str, sink: &TurnSink) -> Result<String>;
}

/// One line of the visible transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// How a submitted question was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The responder answered; the text was also streamed to the sink.
    Answered(String),
    /// The question was rejected with a fixed reply.
    Refused(&'static str),
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Answered(text) => text.as_str(),
            Self::Refused(text) => *text,
        }
    }
}

/// Accepted question length, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellLimits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for ShellLimits {
    fn default() -> Self {
        Self {
            min_chars: 10,
            max_chars: 1000,
        }
    }
}

impl From<&ShellConfig> for ShellLimits {
    fn from(config: &ShellConfig) -> Self {
        Self {
            min_chars: config.min_chars,
            max_chars: config.max_chars,
        }
    }
}

pub struct ChatShell {
    turns: Vec<ChatTurn>,
    session: SessionId,
    responder: Arc<dyn Responder>,
    limits: ShellLimits,
}

impl ChatShell {
    /// A new session opening with the greeting.
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self {
            turns: vec![ChatTurn::assistant(GREETING)],
            session: SessionId::new(),
            responder,
            limits: ShellLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ShellLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Handle one user question.
    ///
    /// Out-of-range questions get a fixed reply. If the responder fails,
    /// the question is taken back out of the transcript and the error is
    /// returned.
    pub async fn submit(&mut self, input: &str, sink: &TurnSink) -> Result<TurnOutcome> {
        self.turns.push(ChatTurn::user(input));

        let chars = input.chars().count();
        let refusal = if chars > self.limits.max_chars {
            Some(TOO_LONG)
        } else if chars < self.limits.min_chars {
            Some(TOO_SHORT)
        } else {
            None
        };

        if let Some(reply) = refusal {
            debug!(chars, "Shell: question rejected");
            self.turns.push(ChatTurn::assistant(reply));
            return Ok(TurnOutcome::Refused(reply));
        }

        info!(session = %self.session, responder = self.responder.name(), "Shell: new turn");
        match self.responder.respond(&self.session, input, sink).await {
            Ok(answer) => {
                self.turns.push(ChatTurn::assistant(answer.clone()));
                Ok(TurnOutcome::Answered(answer))
            }
            Err(e) => {
                warn!(error = %e, "Shell: turn failed");
                self.turns.pop();
                sink.send(AgentStreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }
}
