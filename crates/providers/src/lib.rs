//! LLM Provider implementations for Git Buddy.
//!
//! All providers implement the `gitbuddy_core::Provider` trait. The chat
//! model and the embedding model are both served by the OpenAI-compatible
//! client.

pub mod openai_compat;

pub use openai_compat::{OPENAI_BASE_URL, OpenAiCompatProvider};
