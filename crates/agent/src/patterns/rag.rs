//! RAG pattern: Retrieval-Augmented Generation.
//!
//! The responder retrieves the closest documentation chunks, looks up
//! supplemental web links for their sources, and streams one grounded
//! answer. Each answer goes into the session's memory window.
//!
//! # Flow
//!
//! 1. Retrieve the top-k chunks for the question
//! 2. Resolve and clean source links
//! 3. Wait for the rate limiter
//! 4. Render the prompt, trimming the oldest history to fit the budget
//! 5. Stream the completion to the sink while accumulating the answer
//! 6. Save the exchange

use async_trait::async_trait;
use gitbuddy_core::error::Result;
use gitbuddy_core::memory::{ConversationMemory, Exchange, SessionId, render_transcript};
use gitbuddy_core::provider::{Provider, ProviderRequest};
use gitbuddy_core::retrieval::{RetrievedDocument, VectorStore, render_documents};
use gitbuddy_core::template;
use gitbuddy_memory::WindowMemory;
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::{TokenBudget, Tokenizer, trim_history_to_budget};
use crate::prompt::{RAG_TEMPLATE, render_links};
use crate::rate_limit::RateLimiter;
use crate::shell::Responder;
use crate::sources::SourceExtractor;
use crate::stream_event::{AgentStreamEvent, TurnSink};

/// Exchanges the responder remembers per session.
pub const RAG_WINDOW: usize = 4;

/// Result of one answered question.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    /// Chunks the answer was grounded in.
    pub documents: Vec<RetrievedDocument>,
    /// Links offered to the model for the answer.
    pub sources: Vec<String>,
    /// Oldest exchanges left out of the prompt to fit the budget.
    pub history_dropped: usize,
}

pub struct RagResponder {
    provider: Arc<dyn Provider>,
    store: Arc<dyn VectorStore>,
    sources: SourceExtractor,
    memory: Arc<dyn ConversationMemory>,
    limiter: RateLimiter,
    tokenizer: Tokenizer,
    budget: TokenBudget,
    model: String,
    temperature: f32,
    top_k: usize,
}

impl RagResponder {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn VectorStore>,
        sources: SourceExtractor,
        tokenizer: Tokenizer,
    ) -> Self {
        Self {
            provider,
            store,
            sources,
            memory: Arc::new(WindowMemory::new(RAG_WINDOW)),
            limiter: RateLimiter::default(),
            tokenizer,
            budget: TokenBudget::default(),
            model: "gpt-3.5-turbo".into(),
            temperature: 0.5,
            top_k: 3,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, temperature: f32) -> Self {
        self.model = model.into();
        self.temperature = temperature;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn ConversationMemory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_budget(mut self, budget: TokenBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Answer `query` for `session`, streaming the text into `sink`.
    pub async fn answer(&self, session: &SessionId, query: &str, sink: &TurnSink) -> Result<RagAnswer> {
        info!(model = %self.model, session = %session, "RAG: starting retrieval");

        let documents = self.store.similarity_search(query, self.top_k).await?;
        debug!(documents = documents.len(), "RAG: documents retrieved");

        let sources = self.sources.resolve(&documents).await;
        sink.send(AgentStreamEvent::Sources {
            links: sources.clone(),
        })
        .await;

        self.limiter.acquire().await;

        let history = self.memory.load(session).await;
        let context = render_documents(&documents);
        let url_sources = render_links(&sources);
        let budgeted = trim_history_to_budget(&self.tokenizer, &history, &self.budget, |kept| {
            let chat_history = render_transcript(kept);
            template::render(
                RAG_TEMPLATE,
                &[
                    ("chat_history", chat_history.as_str()),
                    ("context", context.as_str()),
                    ("url_sources", url_sources.as_str()),
                    ("human_input", query),
                ],
            )
        });

        let mut request = ProviderRequest::prompt(&self.model, budgeted.prompt, self.temperature);
        request.stream = true;
        let mut rx = self.provider.stream(request).await?;

        let mut answer = String::new();
        let mut usage = None;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                answer.push_str(&text);
                sink.send(AgentStreamEvent::Chunk { content: text }).await;
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }

        info!(chars = answer.len(), links = sources.len(), "RAG: answer complete");
        self.memory
            .save(session, Exchange::new(query, answer.clone()))
            .await;

        sink.send(AgentStreamEvent::Done {
            session_id: session.to_string(),
            usage,
            iterations: 1,
            tool_calls_made: 0,
        })
        .await;

        Ok(RagAnswer {
            answer,
            documents,
            sources,
            history_dropped: budgeted.dropped,
        })
    }
}

#[async_trait]
impl Responder for RagResponder {
    fn name(&self) -> &str {
        "rag"
    }

    async fn respond(&self, session: &SessionId, query: &str, sink: &TurnSink) -> Result<String> {
        Ok(self.answer(session, query, sink).await?.answer)
    }
}
