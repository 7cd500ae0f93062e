use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::index::{ScoredChunk, VectorIndex};
use crate::llm::LlmProvider;

/// Top-k chunk retrieval for a question.
///
/// The question is embedded with the same provider used at ingestion time,
/// then ranked against the index. No side effects.
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn LlmProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { provider, index }
    }

    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>, ApiError> {
        let embeddings = self.provider.embed(&[question.to_string()]).await?;
        let query_embedding = embeddings.into_iter().next().ok_or_else(|| {
            ApiError::Internal("Embedding provider returned no vector for the question".to_string())
        })?;

        self.index.search(&query_embedding, k).await
    }
}
