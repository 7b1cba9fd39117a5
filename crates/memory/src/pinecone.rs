//! Pinecone vector store: the hosted index of the documentation corpus.
//!
//! The index is populated offline. This client only queries it: the query
//! is embedded through the provider, then sent to the index's `/query`
//! endpoint.

use async_trait::async_trait;
use gitbuddy_core::error::RetrievalError;
use gitbuddy_core::provider::Provider;
use gitbuddy_core::retrieval::{RetrievedDocument, VectorStore};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::vector::embed_query;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metadata key holding the chunk text.
const TEXT_KEY: &str = "text";

pub struct PineconeStore {
    query_url: String,
    api_key: String,
    embedder: Arc<dyn Provider>,
    embeddings_model: String,
    client: reqwest::Client,
}

impl PineconeStore {
    /// Create a client for the index served at `host`.
    pub fn new(
        host: &str,
        api_key: impl Into<String>,
        embedder: Arc<dyn Provider>,
        embeddings_model: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        if host.trim().is_empty() {
            return Err(RetrievalError::NotConfigured(
                "Pinecone index host is empty (set index.host or GITBUDDY_PINECONE_HOST)".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RetrievalError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            query_url: query_url(host),
            api_key: api_key.into(),
            embedder,
            embeddings_model: embeddings_model.into(),
            client,
        })
    }
}

/// `https://<host>/query`, accepting hosts with or without a scheme.
fn query_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/query")
    } else {
        format!("https://{host}/query")
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// Turn index matches into documents; the `text` metadata becomes the content.
fn into_documents(response: QueryResponse) -> Vec<RetrievedDocument> {
    response
        .matches
        .into_iter()
        .map(|m| {
            let mut metadata = m.metadata;
            let content = match metadata.remove(TEXT_KEY) {
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            RetrievedDocument {
                content,
                score: m.score,
                metadata,
            }
        })
        .collect()
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let vector = embed_query(self.embedder.as_ref(), &self.embeddings_model, query).await?;

        let body = serde_json::json!({
            "vector": vector,
            "topK": k,
            "includeMetadata": true,
        });

        debug!(url = %self.query_url, top_k = k, "Querying Pinecone");

        let response = self
            .client
            .post(&self.query_url)
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::QueryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::QueryFailed(format!(
                "Pinecone returned {}: {}",
                status.as_u16(),
                error_body
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("Failed to parse response: {e}")))?;

        Ok(into_documents(parsed))
    }
}
