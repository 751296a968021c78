//! Flat chat transcript driven by the translation pipeline.

use super::pipeline::{TranslationPipeline, TurnOutcome, TurnStage};
use serde::Serialize;
use std::sync::Arc;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the user.
    User,
    /// Translation or error produced by the assistant.
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    /// Who produced the content.
    pub role: Role,
    /// Displayed text.
    pub content: String,
    /// Whether this assistant entry reports a failed turn.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// Result of [`ChatSession::handle_turn`].
#[derive(Debug, Clone)]
pub enum TurnReply {
    /// The pipeline produced a translation.
    Translated(TurnOutcome),
    /// The turn failed; `message` is what the user sees.
    Failed {
        /// Stage the failure happened in.
        stage: TurnStage,
        /// User-visible error text.
        message: String,
    },
}

impl TurnReply {
    /// Text shown as the assistant's reply.
    pub fn text(&self) -> &str {
        match self {
            Self::Translated(outcome) => &outcome.translation,
            Self::Failed { message, .. } => message,
        }
    }

    /// Whether the turn failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Process-lifetime conversation. Turns are handled one at a time; a failed turn leaves the
/// session ready for the next one.
pub struct ChatSession {
    pipeline: Arc<TranslationPipeline>,
    transcript: Vec<ConversationTurn>,
    last_outcome: TurnStage,
}

impl ChatSession {
    /// Start an empty session.
    pub fn new(pipeline: Arc<TranslationPipeline>) -> Self {
        Self {
            pipeline,
            transcript: Vec::new(),
            last_outcome: TurnStage::Idle,
        }
    }

    /// Entries so far, oldest first.
    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    /// Outcome of the most recent turn (`Done` or `Error`), or `Idle` before the first one.
    ///
    /// Between turns the session itself is always idle and ready for input; this only records how
    /// the previous turn ended.
    pub fn last_outcome(&self) -> TurnStage {
        self.last_outcome
    }

    /// Append the user input, run the pipeline, and append the assistant reply.
    pub async fn handle_turn(&mut self, input: &str) -> TurnReply {
        let input = input.trim();
        self.transcript.push(ConversationTurn {
            role: Role::User,
            content: input.to_string(),
            is_error: false,
        });

        let reply = match self.pipeline.translate(input).await {
            Ok(outcome) => {
                self.last_outcome = TurnStage::Done;
                TurnReply::Translated(outcome)
            }
            Err(failure) => {
                tracing::error!(stage = ?failure.stage(), error = %failure, "Translation turn failed");
                self.last_outcome = TurnStage::Error;
                TurnReply::Failed {
                    stage: failure.stage(),
                    message: format!("Error: translation failed ({failure})"),
                }
            }
        };
        self.pipeline.metrics().record_turn(reply.is_error());

        self.transcript.push(ConversationTurn {
            role: Role::Assistant,
            content: reply.text().to_string(),
            is_error: reply.is_error(),
        });
        reply
    }
}
