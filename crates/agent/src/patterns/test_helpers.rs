//! Shared test helpers for pattern tests.

use async_trait::async_trait;
use gitbuddy_core::error::{ProviderError, RetrievalError, ToolError};
use gitbuddy_core::message::Message;
use gitbuddy_core::provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
use gitbuddy_core::retrieval::{RetrievedDocument, SearchEngine, SearchHit, VectorStore};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
    chunk_size: Option<usize>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            chunk_size: None,
        }
    }

    /// One text response per entry, in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| make_text_response(t)).collect())
    }

    pub fn single_text(text: &str) -> Self {
        Self::texts(&[text])
    }

    /// Stream responses in pieces of `chars` characters.
    pub fn chunked(mut self, chars: usize) -> Self {
        self.chunk_size = Some(chars.max(1));
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The single-message prompt of every request so far.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.messages[0].content.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let count = requests.len();

        if count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                count,
                responses.len()
            );
        }

        requests.push(request);
        Ok(responses[count].clone())
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>, ProviderError>
    {
        let response = self.complete(request).await?;
        let chars: Vec<char> = response.message.content.chars().collect();
        let size = self.chunk_size.unwrap_or(chars.len().max(1));
        let pieces: Vec<String> = chars.chunks(size).map(|c| c.iter().collect()).collect();

        let (tx, rx) = tokio::sync::mpsc::channel(pieces.len() + 1);
        for piece in pieces {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(piece),
                    done: false,
                    usage: None,
                }))
                .await;
        }
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        })
    }
}

/// A vector store with a fixed result list that records its queries.
pub struct MockVectorStore {
    documents: Vec<RetrievedDocument>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl MockVectorStore {
    pub fn new(documents: Vec<RetrievedDocument>) -> Self {
        Self {
            documents,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        self.queries.lock().unwrap().push((query.to_string(), k));
        Ok(self.documents.iter().take(k).cloned().collect())
    }
}

/// A search engine answering from a query → links table.
///
/// Unknown queries return no hits.
#[derive(Default)]
pub struct MockSearchEngine {
    links: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(mut self, query: &str, links: &[&str]) -> Self {
        self.links
            .insert(query.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every query received, sorted.
    pub fn queries(&self) -> Vec<String> {
        let mut queries = self.queries.lock().unwrap().clone();
        queries.sort();
        queries
    }
}

#[async_trait]
impl SearchEngine for MockSearchEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(query) {
            return Err(ToolError::SearchFailed(format!("no route for {query}")));
        }
        Ok(self
            .links
            .get(query)
            .map(|links| {
                links
                    .iter()
                    .take(max_results)
                    .enumerate()
                    .map(|(i, link)| SearchHit {
                        title: format!("Result {i}"),
                        link: link.clone(),
                        snippet: format!("About {query}"),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
