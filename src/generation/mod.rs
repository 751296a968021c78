//! Chat-completion providers used for query rewriting and final translation.
//!
//! Both LLM calls of a turn go through the same [`GenerationClient`]; they differ only in the
//! prompt and the requested temperature.

mod gemini;
mod ollama;
mod openai;

pub use gemini::GeminiGenerationClient;
pub use ollama::OllamaGenerationClient;
pub use openai::OpenAiGenerationClient;

use crate::config::{Config, GenerationProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by generation providers.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was unreachable or could not be configured.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider answered without any text.
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

/// Request payload passed to the generation provider.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Fully rendered prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by text generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Complete the prompt and return the raw model text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError>;
}

/// Build the generation client selected by the configuration.
pub fn build_generation_client(
    config: &Config,
) -> Result<Arc<dyn GenerationClient>, GenerationClientError> {
    let providers = &config.providers;
    let client: Arc<dyn GenerationClient> = match config.generation_provider {
        GenerationProvider::Gemini => {
            let api_key = providers.gemini_api_key.clone().ok_or_else(|| {
                GenerationClientError::ProviderUnavailable("GEMINI_API_KEY is not configured".into())
            })?;
            Arc::new(GeminiGenerationClient::new(&providers.gemini_base_url, api_key)?)
        }
        GenerationProvider::OpenAI => {
            let api_key = providers.openai_api_key.clone().ok_or_else(|| {
                GenerationClientError::ProviderUnavailable("OPENAI_API_KEY is not configured".into())
            })?;
            Arc::new(OpenAiGenerationClient::new(&providers.openai_base_url, api_key)?)
        }
        GenerationProvider::Ollama => Arc::new(OllamaGenerationClient::new(&providers.ollama_url)?),
    };
    Ok(client)
}

pub(crate) fn http_client() -> Result<reqwest::Client, GenerationClientError> {
    reqwest::Client::builder()
        .user_agent("rusty-translate/generate")
        .build()
        .map_err(|error| {
            GenerationClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })
}

pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GenerationClientError::GenerationFailed(format!(
        "{provider} returned {status}: {body}"
    )))
}

/// Reject blank completions so callers never treat silence as an answer.
pub(crate) fn non_empty(text: String) -> Result<String, GenerationClientError> {
    if text.trim().is_empty() {
        Err(GenerationClientError::EmptyResponse)
    } else {
        Ok(text)
    }
}
