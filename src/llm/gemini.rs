use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{GenerationOutcome, GenerationRequest};
use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generative Language API client used for both answer generation and
/// embeddings.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(settings: &LlmSettings) -> Result<Self, ApiError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::Internal("GEMINI_API_KEY is not configured".to_string()))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            generation_model: settings.generation_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            client,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, action)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/models/{}", self.base_url, self.generation_model);
        let res = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome, ApiError> {
        let url = self.model_url(&self.generation_model, "generateContent");

        let mut generation_config = json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_output_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        let body = json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user_text }] }],
            "generationConfig": generation_config,
        });

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Gemini generate error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        parse_generation_response(&payload)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.model_url(&self.embedding_model, "batchEmbedContents");
        let model_name = format!("models/{}", self.embedding_model);

        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": model_name,
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Gemini embed error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        parse_embedding_response(&payload, inputs.len())
    }
}

/// Extracts text or a safety block from a `generateContent` payload.
fn parse_generation_response(payload: &Value) -> Result<GenerationOutcome, ApiError> {
    if payload["promptFeedback"]["blockReason"]
        .as_str()
        .is_some_and(|reason| !reason.is_empty())
    {
        return Ok(GenerationOutcome::SafetyBlocked);
    }

    let candidate = &payload["candidates"][0];
    if matches!(
        candidate["finishReason"].as_str(),
        Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST")
    ) {
        return Ok(GenerationOutcome::SafetyBlocked);
    }

    let text = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ApiError::Internal(
            "Gemini returned no candidate text".to_string(),
        ));
    }

    Ok(GenerationOutcome::Text(text))
}

/// Extracts embedding vectors from a `batchEmbedContents` payload and checks
/// the count matches the request batch.
fn parse_embedding_response(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ApiError> {
    let embeddings: Vec<Vec<f32>> = payload["embeddings"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry["values"].as_array())
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default();

    if embeddings.len() != expected {
        return Err(ApiError::Internal(format!(
            "Gemini returned {} embeddings for {} inputs",
            embeddings.len(),
            expected
        )));
    }

    Ok(embeddings)
}
