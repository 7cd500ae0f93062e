use std::sync::Arc;

use crate::core::config::{IngestPolicy, Settings};
use crate::core::errors::ApiError;
use crate::document::{Document, TextChunker};
use crate::index::VectorIndex;
use crate::llm::{GenerationOutcome, LlmProvider};

use super::prompt::{self, NOT_FOUND_PHRASE};
use super::retriever::Retriever;
use super::scorer::FaithfulnessScorer;
use super::types::{Answer, AnswerStatus, QueryOutcome};

/// User-safe fallback when the generation call fails outright. A clinical
/// assistant never returns an empty or raw-error body.
pub const GENERATION_FAILURE_MESSAGE: &str =
    "The assistant could not produce an answer for this question right now. \
     Please try again shortly or consult the guidelines directly.";

/// Shown when the model declines the request on safety grounds. Kept
/// distinct from `GENERATION_FAILURE_MESSAGE` so the UI can tell the two
/// apart.
pub const SAFETY_DECLINE_MESSAGE: &str =
    "The assistant cannot answer this question. Please consult a clinician directly.";

/// Orchestrates ingestion (chunk, embed, index) and querying (retrieve,
/// generate, score).
///
/// The pipeline is sequential; each query performs at most three blocking
/// provider calls (question embedding, answer generation, faithfulness
/// scoring).
pub struct RagEngine {
    provider: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: TextChunker,
    retriever: Retriever,
    scorer: FaithfulnessScorer,
    ingest_policy: IngestPolicy,
    top_k: usize,
    temperature: f64,
}

impl RagEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
        settings: &Settings,
    ) -> Self {
        Self {
            retriever: Retriever::new(provider.clone(), index.clone()),
            scorer: FaithfulnessScorer::new(provider.clone()),
            chunker: TextChunker::new(settings.rag.chunk_size, settings.rag.chunk_overlap),
            ingest_policy: settings.rag.ingest_policy,
            top_k: settings.rag.top_k,
            temperature: settings.llm.temperature,
            provider,
            index,
        }
    }

    /// Ingests one document. Returns the number of chunks stored.
    pub async fn ingest(&self, document: &Document) -> Result<usize, ApiError> {
        self.ingest_many(std::slice::from_ref(document)).await
    }

    /// Ingests a batch of documents in one index write.
    ///
    /// All embeddings are computed before anything is written, and the write
    /// itself is a single transaction: a mid-batch failure leaves the index
    /// exactly as it was.
    pub async fn ingest_many(&self, documents: &[Document]) -> Result<usize, ApiError> {
        let mut chunks = Vec::new();
        for document in documents {
            let mut document_chunks = self.chunker.chunk_document(document);
            if document_chunks.is_empty() {
                return Err(ApiError::BadRequest(format!(
                    "{} contains no text to ingest",
                    document.file_name
                )));
            }
            chunks.append(&mut document_chunks);
        }
        if chunks.is_empty() {
            return Err(ApiError::BadRequest("Nothing to ingest".to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.provider.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ApiError::Internal(format!(
                "Embedding count mismatch: {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let items: Vec<_> = chunks.into_iter().zip(embeddings).collect();
        let ingested = items.len();
        let replace_all = self.ingest_policy == IngestPolicy::Replace;
        self.index.insert_batch(items, replace_all).await?;

        tracing::info!(
            "Ingested {} chunks from {} document(s) (policy: {:?})",
            ingested,
            documents.len(),
            self.ingest_policy
        );
        Ok(ingested)
    }

    /// Answers a question from the ingested guidelines.
    pub async fn query(&self, question: &str) -> Result<QueryOutcome, ApiError> {
        if self.index.count().await? == 0 {
            return Ok(QueryOutcome::NoKnowledge);
        }

        let sources = match self.retriever.retrieve(question, self.top_k).await {
            Ok(sources) => sources,
            Err(err) => {
                tracing::error!("Retrieval failed: {}", err);
                return Ok(QueryOutcome::Answer(Answer {
                    text: GENERATION_FAILURE_MESSAGE.to_string(),
                    confidence_score: 0.0,
                    sources: Vec::new(),
                    status: AnswerStatus::GenerationFailed,
                }));
            }
        };

        let request = prompt::build_answer_request(question, &sources, self.temperature);
        let (text, status) = match self.provider.generate(request).await {
            Ok(GenerationOutcome::Text(text)) => {
                if is_not_found(&text) {
                    (text, AnswerStatus::NotFound)
                } else {
                    (text, AnswerStatus::Answered)
                }
            }
            Ok(GenerationOutcome::SafetyBlocked) => {
                tracing::warn!("Generation safety-blocked for question: {}", question);
                (SAFETY_DECLINE_MESSAGE.to_string(), AnswerStatus::SafetyBlocked)
            }
            Err(err) => {
                tracing::error!("Generation failed: {}", err);
                (
                    GENERATION_FAILURE_MESSAGE.to_string(),
                    AnswerStatus::GenerationFailed,
                )
            }
        };

        // The scorer only runs for a real answer; a non-answer is defined to
        // have zero confidence without spending another model call.
        let confidence_score = match status {
            AnswerStatus::Answered => {
                let context = prompt::format_context(&sources);
                self.scorer.score(&context, &text).await
            }
            _ => 0.0,
        };

        Ok(QueryOutcome::Answer(Answer {
            text,
            confidence_score,
            sources,
            status,
        }))
    }
}

/// Whether the generated text is the deterministic not-found fallback.
/// Matched on the phrase stem so a trailing period or whitespace variation
/// from the model still counts.
fn is_not_found(answer: &str) -> bool {
    let stem = NOT_FOUND_PHRASE.trim_end_matches('.');
    answer.trim().starts_with(stem)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::config::Settings;
    use crate::index::SqliteVectorIndex;
    use crate::llm::GenerationRequest;

    /// Deterministic provider: embeddings from word counts, generation from
    /// a scripted reply queue. Counts calls so tests can assert the scorer
    /// was or was not invoked.
    struct MockProvider {
        replies: Mutex<VecDeque<Result<GenerationOutcome, ApiError>>>,
        embed_calls: AtomicUsize,
        generate_calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(replies: Vec<Result<GenerationOutcome, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                embed_calls: AtomicUsize::new(0),
                generate_calls: AtomicUsize::new(0),
            })
        }

        fn embedding_for(text: &str) -> Vec<f32> {
            let mut vector = vec![0.0f32; 8];
            for word in text.split_whitespace() {
                let bucket = word
                    .to_lowercase()
                    .bytes()
                    .fold(0usize, |acc, b| (acc * 31 + b as usize) % 8);
                vector[bucket] += 1.0;
            }
            vector
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationOutcome, ApiError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(GenerationOutcome::Text("unscripted reply".to_string())))
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|text| Self::embedding_for(text)).collect())
        }
    }

    async fn test_index() -> Arc<SqliteVectorIndex> {
        let tmp = std::env::temp_dir().join(format!(
            "medguide-engine-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        Arc::new(SqliteVectorIndex::with_path(tmp).await.unwrap())
    }

    fn engine_with(
        provider: Arc<MockProvider>,
        index: Arc<SqliteVectorIndex>,
        policy: IngestPolicy,
    ) -> RagEngine {
        let mut settings = Settings::default();
        settings.rag.ingest_policy = policy;
        RagEngine::new(provider, index, &settings)
    }

    fn protocol_doc() -> Document {
        Document::single_page(
            "chest_pain.txt",
            "Administer aspirin 300mg for chest pain per protocol X.",
        )
    }

    #[tokio::test]
    async fn query_before_ingestion_returns_no_knowledge_sentinel() {
        let provider = MockProvider::new(vec![]);
        let engine = engine_with(provider.clone(), test_index().await, IngestPolicy::Replace);

        let outcome = engine.query("What is the aspirin dose?").await.unwrap();
        assert!(matches!(outcome, QueryOutcome::NoKnowledge));
        // The sentinel short-circuits before any provider call.
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn answered_query_scores_faithfulness() {
        let provider = MockProvider::new(vec![
            Ok(GenerationOutcome::Text(
                "Administer 300mg of aspirin. [Source: Page 1]".to_string(),
            )),
            Ok(GenerationOutcome::Text("0.9".to_string())),
        ]);
        let engine = engine_with(provider.clone(), test_index().await, IngestPolicy::Replace);

        engine.ingest(&protocol_doc()).await.unwrap();
        let outcome = engine.query("What is the aspirin dose?").await.unwrap();

        let QueryOutcome::Answer(answer) = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(answer.status, AnswerStatus::Answered);
        assert!(answer.text.contains("300mg"));
        assert!((answer.confidence_score - 0.9).abs() < 1e-6);
        assert!(!answer.sources.is_empty());
        assert_eq!(answer.sources[0].chunk.page_number, 1);
        // One generation for the answer, one for the score.
        assert_eq!(provider.generate_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn not_found_answer_skips_the_scorer() {
        let provider = MockProvider::new(vec![Ok(GenerationOutcome::Text(
            NOT_FOUND_PHRASE.to_string(),
        ))]);
        let engine = engine_with(provider.clone(), test_index().await, IngestPolicy::Replace);

        engine.ingest(&protocol_doc()).await.unwrap();
        let outcome = engine.query("What is the tetanus schedule?").await.unwrap();

        let QueryOutcome::Answer(answer) = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(answer.status, AnswerStatus::NotFound);
        assert_eq!(answer.confidence_score, 0.0);
        // Only the answer generation ran; the scorer was never invoked.
        assert_eq!(provider.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn safety_block_degrades_to_decline_message() {
        let provider = MockProvider::new(vec![Ok(GenerationOutcome::SafetyBlocked)]);
        let engine = engine_with(provider.clone(), test_index().await, IngestPolicy::Replace);

        engine.ingest(&protocol_doc()).await.unwrap();
        let outcome = engine.query("dangerous question").await.unwrap();

        let QueryOutcome::Answer(answer) = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(answer.status, AnswerStatus::SafetyBlocked);
        assert_eq!(answer.text, SAFETY_DECLINE_MESSAGE);
        assert_eq!(answer.confidence_score, 0.0);
        assert_eq!(provider.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generation_failure_degrades_to_apology() {
        let provider = MockProvider::new(vec![Err(ApiError::Internal(
            "upstream 500".to_string(),
        ))]);
        let engine = engine_with(provider.clone(), test_index().await, IngestPolicy::Replace);

        engine.ingest(&protocol_doc()).await.unwrap();
        let outcome = engine.query("What is the aspirin dose?").await.unwrap();

        let QueryOutcome::Answer(answer) = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(answer.status, AnswerStatus::GenerationFailed);
        assert_eq!(answer.text, GENERATION_FAILURE_MESSAGE);
        assert_eq!(answer.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn unparseable_score_falls_back_to_default() {
        let provider = MockProvider::new(vec![
            Ok(GenerationOutcome::Text(
                "Give 300mg aspirin. [Source: Page 1]".to_string(),
            )),
            Ok(GenerationOutcome::Text("fully supported!".to_string())),
        ]);
        let engine = engine_with(provider.clone(), test_index().await, IngestPolicy::Replace);

        engine.ingest(&protocol_doc()).await.unwrap();
        let outcome = engine.query("What is the aspirin dose?").await.unwrap();

        let QueryOutcome::Answer(answer) = outcome else {
            panic!("expected an answer");
        };
        assert!((answer.confidence_score - super::super::scorer::DEFAULT_SCORE).abs() < 1e-6);
    }

    #[tokio::test]
    async fn replace_policy_rebuilds_the_index_per_ingestion() {
        let provider = MockProvider::new(vec![]);
        let index = test_index().await;
        let engine = engine_with(provider, index.clone(), IngestPolicy::Replace);

        engine.ingest(&protocol_doc()).await.unwrap();
        let first_count = index.count().await.unwrap();
        engine.ingest(&protocol_doc()).await.unwrap();

        // Re-uploading the same document does not duplicate chunks.
        assert_eq!(index.count().await.unwrap(), first_count);
    }

    #[tokio::test]
    async fn append_policy_accumulates_documents() {
        let provider = MockProvider::new(vec![]);
        let index = test_index().await;
        let engine = engine_with(provider, index.clone(), IngestPolicy::Append);

        engine.ingest(&protocol_doc()).await.unwrap();
        let first_count = index.count().await.unwrap();
        engine
            .ingest(&Document::single_page(
                "sepsis.txt",
                "Draw blood cultures before antibiotics.",
            ))
            .await
            .unwrap();

        assert!(index.count().await.unwrap() > first_count);
    }

    #[tokio::test]
    async fn empty_document_is_rejected_without_index_writes() {
        let provider = MockProvider::new(vec![]);
        let index = test_index().await;
        let engine = engine_with(provider.clone(), index.clone(), IngestPolicy::Replace);

        let result = engine
            .ingest(&Document::single_page("empty.txt", ""))
            .await;
        assert!(result.is_err());
        assert_eq!(index.count().await.unwrap(), 0);
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn not_found_detection_tolerates_trailing_punctuation() {
        assert!(is_not_found("Information not found in guidelines."));
        assert!(is_not_found("Information not found in guidelines"));
        assert!(is_not_found("  Information not found in guidelines.\n"));
        assert!(!is_not_found("Aspirin 300mg. [Source: Page 1]"));
    }
}
