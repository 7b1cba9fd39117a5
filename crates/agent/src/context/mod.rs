//! Prompt-size control.
//!
//! Every assembled prompt is measured with the `cl100k_base` tokenizer and
//! held under a [`TokenBudget`]. Only conversation history is ever trimmed,
//! oldest first; instructions, retrieved context, and the question are
//! kept verbatim.

pub mod token;

pub use token::{
    BudgetedPrompt, HISTORY_MARKER, TokenBudget, Tokenizer, reduce_tokens_if_needed,
    trim_history_to_budget,
};
