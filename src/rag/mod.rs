//! Retrieval-augmented question answering over ingested guidelines.
//!
//! `RagEngine` composes the chunker, embedding provider, and vector index at
//! ingestion time, and the retriever, prompt builder, generator, and
//! faithfulness scorer at query time.

mod engine;
mod prompt;
mod retriever;
mod scorer;
pub mod seed;
mod types;

pub use engine::{RagEngine, GENERATION_FAILURE_MESSAGE, SAFETY_DECLINE_MESSAGE};
pub use prompt::NOT_FOUND_PHRASE;
pub use retriever::Retriever;
pub use scorer::FaithfulnessScorer;
pub use types::{Answer, AnswerStatus, QueryOutcome};
