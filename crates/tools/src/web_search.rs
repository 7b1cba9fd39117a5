//! Site-scoped web search tools.
//!
//! `Search GitHub` and `Search Git` run the same search engine with the
//! query pinned to one documentation site, and answer with the result
//! snippets joined into a single passage.

use async_trait::async_trait;
use gitbuddy_core::error::ToolError;
use gitbuddy_core::retrieval::{SearchEngine, format_snippets};
use gitbuddy_core::tool::{Tool, ToolResult, query_argument};
use std::sync::Arc;

pub const GITHUB_DOCS_SITE: &str = "https://docs.github.com/en";
pub const GIT_DOCS_SITE: &str = "https://git-scm.com";

pub struct SiteSearchTool {
    name: &'static str,
    description: &'static str,
    site: &'static str,
    engine: Arc<dyn SearchEngine>,
    max_results: usize,
}

impl SiteSearchTool {
    /// `Search GitHub`: scoped to the GitHub documentation.
    pub fn github(engine: Arc<dyn SearchEngine>, max_results: usize) -> Self {
        Self {
            name: "Search GitHub",
            description: "Useful for when you need to answer questions related to GitHub documentation",
            site: GITHUB_DOCS_SITE,
            engine,
            max_results,
        }
    }

    /// `Search Git`: scoped to git-scm.com.
    pub fn git(engine: Arc<dyn SearchEngine>, max_results: usize) -> Self {
        Self {
            name: "Search Git",
            description: "Useful for when you need to answer questions related to Git documentation",
            site: GIT_DOCS_SITE,
            engine,
            max_results,
        }
    }

    fn scoped_query(&self, input: &str) -> String {
        format!("site:{} {}", self.site, input)
    }
}

#[async_trait]
impl Tool for SiteSearchTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = self.scoped_query(query_argument(&arguments)?);

        let hits = self
            .engine
            .search(&query, self.max_results)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name.into(),
                reason: e.to_string(),
            })?;

        tracing::debug!(tool = self.name, hits = hits.len(), "Site search finished");

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format_snippets(&hits),
            data: Some(serde_json::json!({
                "links": hits.iter().map(|h| h.link.as_str()).collect::<Vec<_>>(),
            })),
        })
    }
}
