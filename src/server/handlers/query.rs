use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::index::ScoredChunk;
use crate::rag::QueryOutcome;
use crate::state::AppState;

const SNIPPET_CHARS: usize = 150;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

pub async fn query_guidelines(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine()?;

    let question = payload.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".to_string()));
    }

    let started = Instant::now();
    match engine.query(question).await? {
        QueryOutcome::NoKnowledge => Err(ApiError::BadRequest(
            "No guidelines loaded. Upload documents or seed the protocol corpus first.".to_string(),
        )),
        QueryOutcome::Answer(answer) => {
            let sources: Vec<Value> = answer.sources.iter().map(source_json).collect();

            Ok(Json(json!({
                "answer": answer.text,
                "sources": sources,
                "confidence_score": answer.confidence_score,
                "status": answer.status,
                "processing_time": started.elapsed().as_secs_f64(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })))
        }
    }
}

fn source_json(scored: &ScoredChunk) -> Value {
    json!({
        "file_name": scored.chunk.source_file,
        "page_number": scored.chunk.page_number,
        "text_snippet": snippet(&scored.chunk.text),
    })
}

/// First 150 characters of the chunk, with an ellipsis when truncated.
fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(SNIPPET_CHARS).collect();
    if trimmed.chars().count() > SNIPPET_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(snippet("Aspirin 300mg."), "Aspirin 300mg.");
    }

    #[test]
    fn long_text_gets_an_ellipsis() {
        let text = "x".repeat(200);
        let result = snippet(&text);
        assert_eq!(result.chars().count(), SNIPPET_CHARS + 3);
        assert!(result.ends_with("..."));
    }
}
