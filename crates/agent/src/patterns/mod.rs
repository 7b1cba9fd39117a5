//! Answering patterns.
//!
//! 1. **RAG**: one grounded, streamed answer per question, with
//!    supplemental source links
//! 2. **ReAct**: Thought → Action → Observation over the search and
//!    retrieval tools, with a text-protocol output parser

pub mod parser;
pub mod rag;
pub mod react;

pub use parser::{AgentAction, AgentFinish, AgentOutput, parse_output};
pub use rag::{RagAnswer, RagResponder};
pub use react::{AgentStep, ReactAgent, ReactResult, salvage_parse_error};

#[cfg(test)]
pub(crate) mod test_helpers;
