//! Vector similarity and an in-process vector store.

use async_trait::async_trait;
use gitbuddy_core::error::RetrievalError;
use gitbuddy_core::provider::{EmbeddingRequest, Provider};
use gitbuddy_core::retrieval::{RetrievedDocument, VectorStore};
use std::sync::Arc;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Embedding helper shared by the stores: one query in, one vector out.
pub(crate) async fn embed_query(
    embedder: &dyn Provider,
    model: &str,
    query: &str,
) -> Result<Vec<f32>, RetrievalError> {
    let response = embedder
        .embed(EmbeddingRequest {
            model: model.to_string(),
            inputs: vec![query.to_string()],
        })
        .await
        .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

    response
        .embeddings
        .into_iter()
        .next()
        .ok_or_else(|| RetrievalError::EmbeddingFailed("empty embedding response".into()))
}

/// Pre-embedded documents ranked by cosine similarity to the query embedding.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Provider>,
    model: String,
    documents: Vec<(RetrievedDocument, Vec<f32>)>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            embedder,
            model: model.into(),
            documents: Vec::new(),
        }
    }

    /// Add a document with its precomputed embedding.
    pub fn insert(&mut self, document: RetrievedDocument, embedding: Vec<f32>) {
        self.documents.push((document, embedding));
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rank the stored documents against an already-embedded query.
    pub fn rank(&self, query_embedding: &[f32], k: usize) -> Vec<RetrievedDocument> {
        let mut scored: Vec<RetrievedDocument> = self
            .documents
            .iter()
            .map(|(doc, emb)| {
                let mut d = doc.clone();
                d.score = cosine_similarity(emb, query_embedding);
                d
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let embedding = embed_query(self.embedder.as_ref(), &self.model, query).await?;
        Ok(self.rank(&embedding, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitbuddy_core::error::ProviderError;
    use gitbuddy_core::message::Message;
    use gitbuddy_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    /// Embeds text by counting a few keywords.
    struct KeywordEmbedder;

    #[async_trait]
    impl Provider for KeywordEmbedder {
        fn name(&self) -> &str {
            "keywords"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(""),
                usage: None,
                model: "none".into(),
            })
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            let embeddings = request
                .inputs
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    ["branch", "commit", "pull request"]
                        .iter()
                        .map(|w| t.matches(w).count() as f32)
                        .collect()
                })
                .collect();
            Ok(EmbeddingResponse {
                embeddings,
                model: request.model,
                usage: None,
            })
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn rank_orders_by_similarity_and_truncates() {
        let mut store = InMemoryVectorStore::new(Arc::new(KeywordEmbedder), "test");
        store.insert(RetrievedDocument::new("orthogonal", "a", 0.0), vec![0.0, 1.0, 0.0]);
        store.insert(RetrievedDocument::new("identical", "b", 0.0), vec![1.0, 0.0, 0.0]);
        store.insert(RetrievedDocument::new("partial", "c", 0.0), vec![0.5, 0.5, 0.0]);

        let ranked = store.rank(&[1.0, 0.0, 0.0], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].content, "identical");
        assert_eq!(ranked[1].content, "partial");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[tokio::test]
    async fn similarity_search_embeds_query() {
        let mut store = InMemoryVectorStore::new(Arc::new(KeywordEmbedder), "text-embedding-ada-002");
        store.insert(
            RetrievedDocument::new("Create a branch with git branch.", "progit\\branching.pdf", 0.0),
            vec![1.0, 0.0, 0.0],
        );
        store.insert(
            RetrievedDocument::new("Open a pull request on GitHub.", "github\\pulls.md", 0.0),
            vec![0.0, 0.0, 1.0],
        );

        let docs = store.similarity_search("how do I open a pull request", 1).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source(), Some("github\\pulls.md"));
    }
}
