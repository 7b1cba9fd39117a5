//! # Git Buddy Core
//!
//! Domain types, traits, and error definitions for Git Buddy, a
//! retrieval-augmented assistant for Git, GitHub, and TortoiseGit beginners.
//! This crate has **zero framework dependencies**: it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in
//! their respective crates:
//! - [`Provider`]: chat completion and embedding models
//! - [`VectorStore`]: similarity search over the documentation corpus
//! - [`SearchEngine`]: free-text web search
//! - [`ConversationMemory`]: per-session windows of recent exchanges
//! - [`Tool`]: capabilities the ReAct agent can call

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod template;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use memory::{ConversationMemory, Exchange, SessionId};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use retrieval::{RetrievedDocument, SearchEngine, SearchHit, VectorStore};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
