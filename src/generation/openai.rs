use super::{
    GenerationClient, GenerationClientError, GenerationRequest, check_status, http_client,
    non_empty,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiGenerationClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiGenerationClient {
    /// Construct a client against an OpenAI-compatible API rooted at `base_url`.
    pub fn new(base_url: &str, api_key: String) -> Result<Self, GenerationClientError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationClient for OpenAiGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        let payload = json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach OpenAI at {}: {error}",
                    self.base_url
                ))
            })?;
        let response = check_status("OpenAI", response).await?;

        let body: ChatResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode OpenAI response: {error}"
            ))
        })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        non_empty(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .body_contains("\"model\":\"gpt-4o-mini\"")
                    .body_contains("Good morning");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "Günaydın" } }]
                }));
            })
            .await;

        let client =
            OpenAiGenerationClient::new(&server.base_url(), "sk-test".into()).expect("client");
        let text = client
            .generate(GenerationRequest {
                model: "gpt-4o-mini".into(),
                prompt: "Good morning".into(),
                temperature: 0.2,
            })
            .await
            .expect("text");

        mock.assert_async().await;
        assert_eq!(text, "Günaydın");
    }

    #[tokio::test]
    async fn null_content_is_an_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": null } }]
                }));
            })
            .await;

        let client = OpenAiGenerationClient::new(&server.base_url(), "sk".into()).expect("client");
        let error = client
            .generate(GenerationRequest {
                model: "gpt-4o-mini".into(),
                prompt: "hi".into(),
                temperature: 0.2,
            })
            .await
            .expect_err("empty");
        assert!(matches!(error, GenerationClientError::EmptyResponse));
    }
}
