/// A single-turn generation request: system instruction plus user text.
///
/// The pipeline never sends conversation history; every request is
/// self-contained.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_text: String,
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(system_instruction: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_text: user_text.into(),
            temperature: 0.0,
            max_output_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// What came back from a generation call.
///
/// Safety blocks are detected from response metadata and kept distinguishable
/// from ordinary text so callers never present a decline as a grounded
/// answer.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Text(String),
    SafetyBlocked,
}
