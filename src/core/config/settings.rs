use std::env;
use std::fs;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

/// What an ingestion does to chunks already in the index.
///
/// `Replace` rebuilds the index from the new document alone, so re-uploading
/// a file never duplicates its chunks. `Append` accumulates documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestPolicy {
    Replace,
    Append,
}

impl FromStr for IngestPolicy {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(IngestPolicy::Replace),
            "append" => Ok(IngestPolicy::Append),
            other => Err(ApiError::BadRequest(format!(
                "Invalid ingest policy '{}' (expected 'replace' or 'append')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    pub ingest_policy: IngestPolicy,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            ingest_policy: IngestPolicy::Replace,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Gemini API credential. Read from `GEMINI_API_KEY`; absence puts the
    /// service into a degraded state where only /health responds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub generation_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            generation_model: "gemini-flash-lite-latest".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            temperature: 0.3,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub rag: RagSettings,
    pub llm: LlmSettings,
}

impl Settings {
    /// Loads `config.yml` if present, applies environment overrides, and
    /// validates the result.
    pub fn load(paths: &AppPaths) -> Result<Self, ApiError> {
        let config_path = paths.config_path();
        let mut settings = if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(ApiError::internal)?;
            serde_yaml::from_str::<Settings>(&contents).map_err(|err| {
                ApiError::BadRequest(format!(
                    "Invalid config file {}: {}",
                    config_path.display(),
                    err
                ))
            })?
        } else {
            Settings::default()
        };

        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn has_credentials(&self) -> bool {
        self.llm
            .api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ApiError> {
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key);
            }
        }
        if let Ok(model) = env::var("MEDGUIDE_GENERATION_MODEL") {
            self.llm.generation_model = model;
        }
        if let Ok(model) = env::var("MEDGUIDE_EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }
        if let Some(size) = parse_env_var::<usize>("MEDGUIDE_CHUNK_SIZE")? {
            self.rag.chunk_size = size;
        }
        if let Some(overlap) = parse_env_var::<usize>("MEDGUIDE_CHUNK_OVERLAP")? {
            self.rag.chunk_overlap = overlap;
        }
        if let Some(top_k) = parse_env_var::<usize>("MEDGUIDE_TOP_K")? {
            self.rag.top_k = top_k;
        }
        if let Ok(policy) = env::var("MEDGUIDE_INGEST_POLICY") {
            self.rag.ingest_policy = policy.parse()?;
        }
        if let Some(port) = parse_env_var::<u16>("PORT")? {
            self.server.port = port;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.rag.chunk_size == 0 || self.rag.chunk_size > 100_000 {
            return Err(ApiError::BadRequest(format!(
                "rag.chunk_size must be between 1 and 100000, got {}",
                self.rag.chunk_size
            )));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ApiError::BadRequest(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.top_k == 0 || self.rag.top_k > 100 {
            return Err(ApiError::BadRequest(format!(
                "rag.top_k must be between 1 and 100, got {}",
                self.rag.top_k
            )));
        }
        if !(0.0..=0.3).contains(&self.llm.temperature) {
            return Err(ApiError::BadRequest(format!(
                "llm.temperature must be within [0.0, 0.3], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ApiError::BadRequest(
                "llm.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env_var<T: FromStr>(name: &str) -> Result<Option<T>, ApiError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid value for {}: '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().expect("defaults should validate");
        assert_eq!(settings.rag.chunk_size, 1000);
        assert_eq!(settings.rag.chunk_overlap, 200);
        assert_eq!(settings.rag.top_k, 4);
        assert_eq!(settings.rag.ingest_policy, IngestPolicy::Replace);
        assert!(!settings.has_credentials());
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let mut settings = Settings::default();
        settings.rag.chunk_overlap = settings.rag.chunk_size;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn ingest_policy_parses_case_insensitively() {
        assert_eq!(
            "Replace".parse::<IngestPolicy>().unwrap(),
            IngestPolicy::Replace
        );
        assert_eq!(
            " append ".parse::<IngestPolicy>().unwrap(),
            IngestPolicy::Append
        );
        assert!("merge".parse::<IngestPolicy>().is_err());
    }

    #[test]
    fn generation_temperature_is_capped_low() {
        let mut settings = Settings::default();
        settings.llm.temperature = 0.9;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn blank_api_key_does_not_count_as_credentials() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("   ".to_string());
        assert!(!settings.has_credentials());
    }

    #[test]
    fn yaml_round_trip_preserves_policy() {
        let mut settings = Settings::default();
        settings.rag.ingest_policy = IngestPolicy::Append;
        let yaml = serde_yaml::to_string(&settings).unwrap();
        let parsed: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.rag.ingest_policy, IngestPolicy::Append);
    }
}
