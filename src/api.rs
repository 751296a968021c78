//! HTTP surface for Rusty Translate.
//!
//! This module exposes a compact Axum router over a single shared chat session:
//!
//! - `POST /translate` – Run one translation turn. Failed turns still answer `200` with
//!   `"error": true` and the error text as the reply, matching what the REPL prints.
//! - `GET /transcript` – Every user and assistant entry of the session, oldest first.
//! - `GET /metrics` – Ingestion and turn counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Turns are serialized: the session sits behind a `tokio::sync::Mutex`, so concurrent requests
//! queue instead of interleaving.

use crate::{
    metrics::{MetricsSnapshot, PipelineMetrics},
    translation::{
        ChatSession, ConversationTurn, Language, QuerySource, TranslationPipeline, TurnReply,
        TurnStage,
    },
};
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Abstraction over the chat session used by the HTTP surface.
#[async_trait]
pub trait TranslatorApi: Send + Sync {
    /// Run one turn and record it in the transcript.
    async fn handle_turn(&self, input: &str) -> TurnReply;

    /// Snapshot of the transcript.
    async fn transcript(&self) -> Vec<ConversationTurn>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Chat session shared across requests.
pub struct SharedSession {
    session: Mutex<ChatSession>,
    metrics: Arc<PipelineMetrics>,
}

impl SharedSession {
    /// Wrap a pipeline in a fresh session.
    pub fn new(pipeline: Arc<TranslationPipeline>) -> Self {
        let metrics = Arc::clone(pipeline.metrics());
        Self {
            session: Mutex::new(ChatSession::new(pipeline)),
            metrics,
        }
    }
}

#[async_trait]
impl TranslatorApi for SharedSession {
    async fn handle_turn(&self, input: &str) -> TurnReply {
        self.session.lock().await.handle_turn(input).await
    }

    async fn transcript(&self) -> Vec<ConversationTurn> {
        self.session.lock().await.transcript().to_vec()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Build the HTTP router exposing the translation surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: TranslatorApi + 'static,
{
    Router::new()
        .route("/translate", post(translate::<S>))
        .route("/transcript", get(get_transcript::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /translate` endpoint.
#[derive(Deserialize)]
struct TranslateRequest {
    /// Text in either language.
    text: String,
}

/// Response body for the `POST /translate` endpoint.
#[derive(Serialize)]
struct TranslateResponse {
    /// Translation, or the error text when the turn failed.
    reply: String,
    error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_stage: Option<TurnStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retrieval_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_source: Option<QuerySource>,
    /// Reference chunks the answer was grounded on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    context: Vec<String>,
}

impl From<TurnReply> for TranslateResponse {
    fn from(reply: TurnReply) -> Self {
        match reply {
            TurnReply::Translated(outcome) => Self {
                reply: outcome.translation,
                error: false,
                failed_stage: None,
                language: Some(outcome.language),
                retrieval_query: Some(outcome.query.text),
                query_source: Some(outcome.query.source),
                context: outcome.context.into_iter().map(|chunk| chunk.text).collect(),
            },
            TurnReply::Failed { stage, message } => Self {
                reply: message,
                error: true,
                failed_stage: Some(stage),
                language: None,
                retrieval_query: None,
                query_source: None,
                context: Vec::new(),
            },
        }
    }
}

/// Run one translation turn.
async fn translate<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, AppError>
where
    S: TranslatorApi,
{
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("text must not be empty".into()));
    }
    let reply = service.handle_turn(text).await;
    tracing::info!(error = reply.is_error(), "Translate request completed");
    Ok(Json(reply.into()))
}

/// Response body for `GET /transcript`.
#[derive(Serialize)]
struct TranscriptResponse {
    turns: Vec<ConversationTurn>,
}

async fn get_transcript<S>(State(service): State<Arc<S>>) -> Json<TranscriptResponse>
where
    S: TranslatorApi,
{
    Json(TranscriptResponse {
        turns: service.transcript().await,
    })
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: TranslatorApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "translate",
                method: "POST",
                path: "/translate",
                description: "Translate text in either language using retrieved reference pairs. Response returns { \"reply\": string, \"error\": bool }.",
                request_example: Some(json!({ "text": "Günaydın" })),
            },
            CommandDescriptor {
                name: "transcript",
                method: "GET",
                path: "/transcript",
                description: "Return every user and assistant turn of the running session.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion, turn, and rewrite counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        }
    }
}
