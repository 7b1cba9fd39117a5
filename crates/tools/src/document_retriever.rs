//! Document Retriever: answers from the documentation index.
//!
//! Retrieves the closest chunks for the input and runs one completion with
//! the retrieval QA prompt over them. The agent is told to reach for this
//! tool before any web search.

use async_trait::async_trait;
use gitbuddy_core::error::ToolError;
use gitbuddy_core::provider::{Provider, ProviderRequest};
use gitbuddy_core::retrieval::{VectorStore, render_documents};
use gitbuddy_core::template;
use gitbuddy_core::tool::{Tool, ToolResult, query_argument};
use std::sync::Arc;

pub const DOCUMENT_RETRIEVER: &str = "Document Retriever";

/// Prompt for answering a question from retrieved chunks.
pub const RETRIEVAL_QA_TEMPLATE: &str = "You are Git Buddy, a helpful assistant that teaches Git, GitHub, and TortoiseGit to beginners. Your responses are geared towards beginners.
You should only ever answer questions about Git, GitHub, or TortoiseGit. Never answer any other questions even if you think you know the correct answer.
If possible, please provide example code and always provide the name of the file you pulled an answer from if you pulled an answer from the context.

Use the following pieces of context to answer the question at the end:
{context}

Question: {input}
Answer:";

/// Model settings for the retrieval QA completion.
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub model: String,
    pub temperature: f32,
    pub top_k: usize,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            temperature: 0.5,
            top_k: 3,
        }
    }
}

pub struct DocumentRetrieverTool {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn Provider>,
    settings: RetrieverSettings,
}

impl DocumentRetrieverTool {
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn Provider>,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }
}

#[async_trait]
impl Tool for DocumentRetrieverTool {
    fn name(&self) -> &str {
        DOCUMENT_RETRIEVER
    }

    fn description(&self) -> &str {
        "Useful for when you need to look up documentation before answering a question related to Git, GitHub, or TortoiseGit"
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = query_argument(&arguments)?;
        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: DOCUMENT_RETRIEVER.into(),
            reason,
        };

        let docs = self
            .store
            .similarity_search(query, self.settings.top_k)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let context = render_documents(&docs);
        let prompt = template::render(
            RETRIEVAL_QA_TEMPLATE,
            &[("context", context.as_str()), ("input", query)],
        );

        let response = self
            .provider
            .complete(ProviderRequest::prompt(
                &self.settings.model,
                prompt,
                self.settings.temperature,
            ))
            .await
            .map_err(|e| failed(e.to_string()))?;

        let sources: Vec<&str> = docs.iter().filter_map(|d| d.source()).collect();

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: response.message.content,
            data: Some(serde_json::json!({ "sources": sources })),
        })
    }
}
