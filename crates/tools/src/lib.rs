//! Tool implementations for Git Buddy.
//!
//! The ReAct agent works with three tools, listed to the model in this
//! order: `Search Git`, `Search GitHub` and `Document Retriever`. The
//! DuckDuckGo engine behind the two search tools is also used by the
//! responder to resolve source links.

pub mod document_retriever;
pub mod duckduckgo;
pub mod web_search;

use gitbuddy_core::tool::ToolRegistry;
use std::sync::Arc;

pub use document_retriever::{DocumentRetrieverTool, RetrieverSettings};
pub use duckduckgo::DuckDuckGoSearch;
pub use web_search::SiteSearchTool;

/// Build the agent's tool registry in the order the tools are offered.
pub fn default_registry(
    engine: Arc<dyn gitbuddy_core::SearchEngine>,
    max_results: usize,
    retriever: DocumentRetrieverTool,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SiteSearchTool::git(engine.clone(), max_results)));
    registry.register(Box::new(SiteSearchTool::github(engine, max_results)));
    registry.register(Box::new(retriever));
    registry
}
