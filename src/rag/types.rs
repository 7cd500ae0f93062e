use serde::{Deserialize, Serialize};

use crate::index::ScoredChunk;

/// How the pipeline arrived at the answer text.
///
/// Safety declines and generation failures carry fallback text and must stay
/// distinguishable from grounded answers, so the UI never presents them as
/// confident medical statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Answered,
    NotFound,
    SafetyBlocked,
    GenerationFailed,
}

/// A generated answer with its supporting chunks and confidence.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Faithfulness-based confidence in [0, 1]. Exactly 0.0 for not-found,
    /// safety-blocked, and failed answers.
    pub confidence_score: f32,
    pub sources: Vec<ScoredChunk>,
    pub status: AnswerStatus,
}

/// Result of a query against the engine.
///
/// `NoKnowledge` is a sentinel, not an error: nothing has been ingested yet,
/// which callers must be able to tell apart from a pipeline failure.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    NoKnowledge,
    Answer(Answer),
}
