//! Output parser for the text-protocol agent.
//!
//! The model answers either with a final answer:
//!
//! ```text
//! Thought: I now know the final answer
//! Final Answer: A fork is a copy of a repository.
//! ```
//!
//! or with the next action to take:
//!
//! ```text
//! Thought: I should check the docs
//! Action: Search GitHub
//! Action Input: "fork a repository"
//! ```

use gitbuddy_core::error::{Error, Result};
use regex_lite::Regex;
use std::sync::LazyLock;

const FINAL_ANSWER: &str = "Final Answer:";

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:(.*?)\nAction\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action regex")
});

/// A tool the model asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: String,
    /// The raw model output the action was parsed from.
    pub log: String,
}

/// The model's final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFinish {
    pub output: String,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutput {
    Action(AgentAction),
    Finish(AgentFinish),
}

/// Parse one model completion.
///
/// `Final Answer:` wins wherever it appears; the answer is the text after
/// its last occurrence. Output that is neither a final answer nor an
/// action is an [`Error::OutputParse`].
pub fn parse_output(text: &str) -> Result<AgentOutput> {
    if let Some(idx) = text.rfind(FINAL_ANSWER) {
        return Ok(AgentOutput::Finish(AgentFinish {
            output: text[idx + FINAL_ANSWER.len()..].trim().to_string(),
            log: text.to_string(),
        }));
    }

    let caps = ACTION.captures(text).ok_or_else(|| Error::OutputParse {
        output: text.to_string(),
    })?;
    let tool = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    let tool_input = caps
        .get(2)
        .map(|m| m.as_str().trim_matches(' ').trim_matches('"'))
        .unwrap_or_default();

    Ok(AgentOutput::Action(AgentAction {
        tool: tool.to_string(),
        tool_input: tool_input.to_string(),
        log: text.to_string(),
    }))
}
