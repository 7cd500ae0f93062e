//! Post-hoc faithfulness scoring.
//!
//! A second generation call rates how well the answer is supported by the
//! retrieved context. The model's reply is untrusted input: it is parsed
//! with a fallible step and any unusable reply falls back to a neutral
//! default instead of failing the query.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;

use crate::llm::{GenerationOutcome, GenerationRequest, LlmProvider};

/// Neutral confidence used when the scorer reply cannot be parsed or the
/// scoring call fails.
pub const DEFAULT_SCORE: f32 = 0.8;

const SCORING_INSTRUCTION: &str = "\
You are grading how well an answer is supported by a set of clinical guideline excerpts.
Reply with ONLY a single number between 0.0 and 1.0:
- 0.0 means the answer is unsupported or hallucinated,
- 0.5 means the answer is partially supported,
- 1.0 means the answer is fully supported by the excerpts.
Output the number and nothing else.";

#[derive(Clone)]
pub struct FaithfulnessScorer {
    provider: Arc<dyn LlmProvider>,
}

impl FaithfulnessScorer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Rates `answer` against `context`, always returning a value in [0, 1].
    pub async fn score(&self, context: &str, answer: &str) -> f32 {
        let user_text = format!("Excerpts:\n{}\n\nAnswer:\n{}\n\nScore:", context, answer);
        let request = GenerationRequest::new(SCORING_INSTRUCTION, user_text).with_temperature(0.0);

        let raw = match self.provider.generate(request).await {
            Ok(GenerationOutcome::Text(text)) => text,
            Ok(GenerationOutcome::SafetyBlocked) => {
                tracing::warn!("Faithfulness scoring was safety-blocked, using default score");
                return DEFAULT_SCORE;
            }
            Err(err) => {
                tracing::warn!("Faithfulness scoring failed: {}, using default score", err);
                return DEFAULT_SCORE;
            }
        };

        parse_score(&raw)
            .unwrap_or_else(|| {
                tracing::warn!("Unparseable faithfulness reply '{}', using default score", raw.trim());
                DEFAULT_SCORE
            })
            .clamp(0.0, 1.0)
    }
}

/// Extracts the first numeric literal from the model's reply.
///
/// Returns `None` for non-numeric replies and for numbers outside [0, 1];
/// the caller substitutes `DEFAULT_SCORE`.
pub fn parse_score(raw: &str) -> Option<f32> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("static regex"));

    let value: f32 = re.find(raw.trim())?.as_str().parse().ok()?;
    if !(0.0..=1.0).contains(&value) {
        return None;
    }
    Some(value)
}
