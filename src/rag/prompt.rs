//! Prompt construction for the answer-generation call.

use crate::index::ScoredChunk;
use crate::llm::GenerationRequest;

/// Deterministic fallback the model is instructed to emit verbatim when the
/// context cannot answer the question. Downstream logic matches on this to
/// short-circuit the confidence score to 0.0.
pub const NOT_FOUND_PHRASE: &str = "Information not found in guidelines.";

const SYSTEM_INSTRUCTION: &str = "\
You are a senior clinical AI assistant. Answer the question STRICTLY based on the context provided by the user.

Requirements:
1. Answer in professional medical terminology.
2. CITE YOUR SOURCES. After every specific claim, add [Source: Page X] using the page numbers shown in the context.
3. If the answer is not in the context, reply with exactly: Information not found in guidelines.";

/// Concatenates chunk texts, each prefixed with its page number so the model
/// can cite correctly.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|scored| format!("[Page {}] {}", scored.chunk.page_number, scored.chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the single generation request for a question and its retrieved
/// context.
pub fn build_answer_request(
    question: &str,
    chunks: &[ScoredChunk],
    temperature: f64,
) -> GenerationRequest {
    let user_text = format!(
        "Context:\n{}\n\nQuestion: {}",
        format_context(chunks),
        question
    );

    GenerationRequest::new(SYSTEM_INSTRUCTION, user_text).with_temperature(temperature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentChunk;

    fn scored(text: &str, page: usize) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk {
                id: "c".to_string(),
                text: text.to_string(),
                source_file: "protocol.pdf".to_string(),
                page_number: page,
                chunk_index: 0,
                start_offset: 0,
            },
            score: 0.9,
        }
    }

    #[test]
    fn context_prefixes_each_chunk_with_its_page() {
        let context = format_context(&[
            scored("Administer aspirin 300mg.", 1),
            scored("Avoid nitroglycerin below 90 mmHg systolic.", 3),
        ]);

        assert!(context.contains("[Page 1] Administer aspirin 300mg."));
        assert!(context.contains("[Page 3] Avoid nitroglycerin"));
    }

    #[test]
    fn request_carries_question_context_and_fallback_instruction() {
        let request = build_answer_request(
            "What is the aspirin dose?",
            &[scored("Administer aspirin 300mg.", 1)],
            0.3,
        );

        assert!(request.user_text.contains("What is the aspirin dose?"));
        assert!(request.user_text.contains("[Page 1]"));
        assert!(request.system_instruction.contains(NOT_FOUND_PHRASE));
        assert!(request.system_instruction.contains("[Source: Page X]"));
        assert!((request.temperature - 0.3).abs() < f64::EPSILON);
    }
}
