use super::{EmbeddingClient, EmbeddingClientError, check_status, http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Local Ollama `/api/embed` client.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Construct a client for `model` served by the Ollama runtime at `base_url`.
    pub fn new(base_url: &str, model: String) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;
        let response = check_status("Ollama", response).await?;

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;
        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn ollama_embed_returns_vectors() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed").json_body(json!({
                    "model": "nomic-embed-text",
                    "input": ["merhaba"]
                }));
                then.status(200)
                    .json_body(json!({ "embeddings": [[0.5, 0.5, 0.0]] }));
            })
            .await;

        let client = OllamaEmbeddingClient::new(&server.base_url(), "nomic-embed-text".into())
            .expect("client");
        let vectors = client
            .generate_embeddings(vec!["merhaba".into()])
            .await
            .expect("vectors");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.5, 0.5, 0.0]]);
    }

    #[tokio::test]
    async fn missing_model_surfaces_as_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(404).body("model not found");
            })
            .await;

        let client =
            OllamaEmbeddingClient::new(&server.base_url(), "missing".into()).expect("client");
        let error = client
            .generate_embeddings(vec!["x".into()])
            .await
            .expect_err("404");
        assert!(error.to_string().contains("model not found"));
    }
}
