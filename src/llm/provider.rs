use async_trait::async_trait;

use super::types::{GenerationOutcome, GenerationRequest};
use crate::core::errors::ApiError;

/// Text generation and embedding behind one interface.
///
/// Ingestion and query embedding must go through the same provider instance:
/// mixing embedding models across the two sides degrades retrieval silently,
/// so the engine owns exactly one provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// check if the provider is reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// single blocking text generation call
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome, ApiError>;

    /// generate embeddings for a batch of inputs, order preserved
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
