//! The answering side of Git Buddy.
//!
//! A question flows **Shell → Responder → Source Extractor + Token
//! Budgeter → model / vector store / search → answer → Shell**:
//!
//! 1. **Shell** checks the question length and keeps the transcript
//! 2. **Responder** is either the RAG pattern (one grounded, streamed
//!    answer) or the ReAct agent (tool loop over search and retrieval)
//! 3. **Source Extractor** turns document sources into web links
//! 4. **Token Budgeter** keeps each prompt under the token limit by
//!    trimming the oldest history
//! 5. **Rate limiter** paces calls to the chat model

pub mod context;
pub mod patterns;
pub mod prompt;
pub mod rate_limit;
pub mod shell;
pub mod sources;
pub mod stream_event;

pub use context::{BudgetedPrompt, TokenBudget, Tokenizer};
pub use patterns::{RagAnswer, RagResponder, ReactAgent, ReactResult, salvage_parse_error};
pub use rate_limit::RateLimiter;
pub use shell::{ChatShell, ChatTurn, Responder, ShellLimits, TurnOutcome};
pub use sources::{SourceExtractor, SourceSettings};
pub use stream_event::{AgentStreamEvent, TurnSink};
