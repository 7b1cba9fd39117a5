//! Retrieval traits: the documentation vector store and the web search engine.
//!
//! Both are external services; these traits are the seams the responder
//! and the agent tools are written against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::{RetrievalError, ToolError};

/// A document chunk returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// The chunk text
    pub content: String,

    /// Similarity score reported by the store
    #[serde(default)]
    pub score: f32,

    /// Store metadata; `source` names the originating document
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, source: impl Into<String>, score: f32) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert("source".into(), serde_json::Value::String(source.into()));
        Self {
            content: content.into(),
            score,
            metadata,
        }
    }

    /// The `source` metadata field, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// Render documents as prompt context, one block per document.
pub fn render_documents(docs: &[RetrievedDocument]) -> String {
    docs.iter()
        .map(|d| match d.source() {
            Some(source) => format!("[source: {}]\n{}", source, d.content),
            None => d.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Similarity search over the documentation corpus.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The store name (e.g., "pinecone", "in_memory").
    fn name(&self) -> &str;

    /// Return the `k` documents most similar to `query`, best first.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> std::result::Result<Vec<RetrievedDocument>, RetrievalError>;
}

/// A single web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Free-text web search.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// The engine name (e.g., "duckduckgo").
    fn name(&self) -> &str;

    /// Search and return up to `max_results` hits.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<SearchHit>, ToolError>;
}

/// Render hits as a bracketed text blob:
/// `[snippet: ..., title: ..., link: ...], [snippet: ...]`.
pub fn format_results(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("[snippet: {}, title: {}, link: {}]", h.snippet, h.title, h.link))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Join hit snippets into a single passage.
pub fn format_snippets(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No good search result found".into();
    }
    hits.iter()
        .map(|h| h.snippet.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
