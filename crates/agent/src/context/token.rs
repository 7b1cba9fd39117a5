//! Token counting and history trimming.
//!
//! Counts use the `cl100k_base` BPE, the encoding of the chat and embedding
//! models Git Buddy talks to, so a budget here matches what the API bills.

use gitbuddy_config::BudgetConfig;
use gitbuddy_core::error::{Error, Result};
use gitbuddy_core::memory::Exchange;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Text that introduces the conversation history in every prompt template.
///
/// Everything after it is history, and trimming starts right after it.
pub const HISTORY_MARKER: &str = "Previous conversation history:\n";

/// A shareable `cl100k_base` tokenizer.
#[derive(Clone)]
pub struct Tokenizer {
    bpe: Arc<CoreBPE>,
}

impl Tokenizer {
    /// Load the `cl100k_base` encoding.
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| Error::Internal(format!("Failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe.encode_ordinary(text)
    }

    pub fn decode(&self, tokens: &[usize]) -> Result<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| Error::Internal(format!("Token decode failed: {e}")))
    }

    /// Decode `tokens` with the first `skip` removed.
    ///
    /// A cut inside a multi-byte character moves forward to the next token
    /// boundary that decodes cleanly.
    fn decode_after(&self, tokens: &[usize], skip: usize) -> Result<String> {
        let mut last_err = None;
        for start in skip..tokens.len() {
            match self.decode(&tokens[start..]) {
                Ok(text) => return Ok(text),
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(String::new()),
        }
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Tokenizer(cl100k_base)")
    }
}

/// Prompt size limits. Trimming starts above `max_tokens` and aims for
/// `target_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub max_tokens: usize,
    pub target_tokens: usize,
}

impl TokenBudget {
    pub fn new(max_tokens: usize, target_tokens: usize) -> Self {
        Self {
            max_tokens,
            target_tokens: target_tokens.min(max_tokens),
        }
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new(60_000, 40_000)
    }
}

impl From<&BudgetConfig> for TokenBudget {
    fn from(config: &BudgetConfig) -> Self {
        Self::new(config.max_tokens, config.target_tokens)
    }
}

/// Cut `text` back under budget by removing tokens from the start of its
/// history segment.
///
/// Text within `max_tokens` comes back unchanged. Otherwise everything up
/// to and including [`HISTORY_MARKER`] is kept (nothing, when the marker is
/// absent), and `current - target_tokens` tokens are dropped from the front
/// of the rest. If the history segment is not even that long, the history
/// segment alone is returned.
pub fn reduce_tokens_if_needed(
    tokenizer: &Tokenizer,
    text: &str,
    max_tokens: usize,
    target_tokens: usize,
) -> Result<String> {
    let current = tokenizer.count(text);
    if current <= max_tokens {
        return Ok(text.to_string());
    }

    let split = text
        .find(HISTORY_MARKER)
        .map(|idx| idx + HISTORY_MARKER.len())
        .unwrap_or(0);
    let (prefix, history) = text.split_at(split);

    let excess = current.saturating_sub(target_tokens);
    let history_tokens = tokenizer.encode(history);

    if history_tokens.len() <= excess {
        warn!(
            current,
            history = history_tokens.len(),
            excess,
            "History shorter than the overflow; keeping the history segment only"
        );
        return Ok(history.to_string());
    }

    warn!(current, max_tokens, target_tokens, "Trimming oldest history tokens");
    let trimmed = tokenizer.decode_after(&history_tokens, excess)?;
    Ok(format!("{prefix}{trimmed}"))
}

/// A prompt rendered within budget.
#[derive(Debug, Clone)]
pub struct BudgetedPrompt {
    pub prompt: String,
    /// How many of the oldest exchanges were left out.
    pub dropped: usize,
}

/// Render a prompt from `history`, dropping whole exchanges (oldest first)
/// if it exceeds the budget.
///
/// Once over `max_tokens`, exchanges are dropped until the prompt fits
/// `target_tokens` or no history is left. The returned prompt is the one
/// to send.
pub fn trim_history_to_budget(
    tokenizer: &Tokenizer,
    history: &[Exchange],
    budget: &TokenBudget,
    render: impl Fn(&[Exchange]) -> String,
) -> BudgetedPrompt {
    let mut prompt = render(history);
    let initial = tokenizer.count(&prompt);
    if initial <= budget.max_tokens {
        return BudgetedPrompt { prompt, dropped: 0 };
    }

    let mut dropped = 0;
    while dropped < history.len() {
        dropped += 1;
        prompt = render(&history[dropped..]);
        if tokenizer.count(&prompt) <= budget.target_tokens {
            break;
        }
    }

    warn!(
        tokens = initial,
        max_tokens = budget.max_tokens,
        dropped,
        "Prompt over budget; dropped oldest exchanges"
    );

    BudgetedPrompt { prompt, dropped }
}
