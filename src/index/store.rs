use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::document::DocumentChunk;

/// A chunk paired with its similarity to a query embedding.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity, higher is better.
    pub score: f32,
}

/// Abstract storage for (embedding, chunk) entries.
///
/// Results are ranked by descending similarity with ties broken by insertion
/// order. An empty index answers searches with an empty result, never an
/// error.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert chunks with their embeddings in one atomic batch.
    ///
    /// With `replace_all` the previous contents are dropped in the same
    /// transaction, so concurrent readers observe either the old index or
    /// the new one. A mid-batch failure leaves the index unchanged.
    async fn insert_batch(
        &self,
        items: Vec<(DocumentChunk, Vec<f32>)>,
        replace_all: bool,
    ) -> Result<(), ApiError>;

    /// The `k` entries most similar to the query embedding.
    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, ApiError>;

    /// Total stored chunk count.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Remove every entry, returning how many were dropped.
    async fn clear(&self) -> Result<usize, ApiError>;
}
