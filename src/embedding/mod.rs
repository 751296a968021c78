//! Embedding providers used to vectorise corpus chunks and retrieval queries.
//!
//! The same client (and therefore the same model) must be used at ingestion and at query time;
//! the vector store manifest records which provider and model built an index so mismatches can be
//! reported before retrieval.

mod gemini;
mod hashed;
mod ollama;
mod openai;

pub use gemini::GeminiEmbeddingClient;
pub use hashed::HashedEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider could not be reached or the client could not be built.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider response could not be parsed.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build the embedding client selected by the configuration.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    let providers = &config.providers;
    let model = config.embedding_model.clone();
    tracing::debug!(
        provider = config.embedding_provider.as_str(),
        model = %model,
        "Building embedding client"
    );

    let client: Arc<dyn EmbeddingClient> = match config.embedding_provider {
        EmbeddingProvider::Gemini => Arc::new(GeminiEmbeddingClient::new(
            &providers.gemini_base_url,
            require_key(providers.gemini_api_key.as_deref(), "GEMINI_API_KEY")?,
            model,
        )?),
        EmbeddingProvider::OpenAI => Arc::new(OpenAiEmbeddingClient::new(
            &providers.openai_base_url,
            require_key(providers.openai_api_key.as_deref(), "OPENAI_API_KEY")?,
            model,
        )?),
        EmbeddingProvider::Ollama => {
            Arc::new(OllamaEmbeddingClient::new(&providers.ollama_url, model)?)
        }
        EmbeddingProvider::Hashed => {
            Arc::new(HashedEmbeddingClient::new(config.embedding_dimension))
        }
    };
    Ok(client)
}

fn require_key(key: Option<&str>, name: &str) -> Result<String, EmbeddingClientError> {
    key.map(str::to_string).ok_or_else(|| {
        EmbeddingClientError::ProviderUnavailable(format!("{name} is not configured"))
    })
}

pub(crate) fn http_client() -> Result<reqwest::Client, EmbeddingClientError> {
    reqwest::Client::builder()
        .user_agent("rusty-translate/embed")
        .build()
        .map_err(|error| {
            EmbeddingClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })
}

/// Turn a non-success response into a provider error carrying status and body.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, EmbeddingClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EmbeddingClientError::GenerationFailed(format!(
        "{provider} returned {status}: {body}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key: &str| map.get(key).cloned()).expect("config")
    }

    #[tokio::test]
    async fn hashed_provider_needs_no_network() {
        let config = config(&[
            ("EMBEDDING_PROVIDER", "hashed"),
            ("EMBEDDING_DIMENSION", "16"),
            ("GENERATION_PROVIDER", "ollama"),
        ]);
        let client = build_embedding_client(&config).expect("client");
        let vectors = client
            .generate_embeddings(vec!["Günaydın".into()])
            .await
            .expect("vectors");
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 16);
    }

    #[test]
    fn remote_providers_build_with_credentials() {
        let config = config(&[
            ("EMBEDDING_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("GENERATION_PROVIDER", "ollama"),
        ]);
        assert!(build_embedding_client(&config).is_ok());
    }
}
