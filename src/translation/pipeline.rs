//! One translation turn: sniff, rewrite, retrieve, render, generate.
//!
//! The rewritten query is used only for retrieval. The prompt's `{question}` always receives the
//! user's original input, so the model decides the translation direction from what was typed.

use super::{
    language::{Language, LanguagePair, sniff_language},
    prompt::{PromptFields, PromptTemplate, format_context, rewrite_prompt},
};
use crate::{
    embedding::{EmbeddingClient, EmbeddingClientError},
    generation::{GenerationClient, GenerationClientError, GenerationRequest},
    metrics::PipelineMetrics,
    store::{RetrievedChunk, StoreError, VectorStore},
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Stages a turn moves through. A failed rewrite does not leave `RewritingQuery` for `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    /// Waiting for input.
    Idle,
    /// Translating source-language input into a retrieval query.
    RewritingQuery,
    /// Embedding the query and searching the index.
    Retrieving,
    /// Building the final prompt.
    Rendering,
    /// Waiting on the generation model.
    Generating,
    /// Turn produced a translation.
    Done,
    /// Turn failed; the error message becomes the assistant reply.
    Error,
}

/// Query rewrite did not produce usable text. Recovered by retrieving with the original input.
#[derive(Debug, Error)]
#[error("query rewrite failed: {0}")]
pub struct RewriteFailure(#[from] pub GenerationClientError);

/// Retrieval stage failures.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Query could not be embedded.
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Provider returned no vector for the query.
    #[error("embedding provider returned no vector for the query")]
    EmptyEmbedding,
    /// Index search failed.
    #[error("index search failed: {0}")]
    Store(#[from] StoreError),
}

/// Failures that end a turn. The session reports them and accepts the next turn.
#[derive(Debug, Error)]
pub enum PipelineFailure {
    /// Retrieval failed.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    /// Final generation failed.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationClientError),
}

impl PipelineFailure {
    /// Stage in which the failure happened.
    pub fn stage(&self) -> TurnStage {
        match self {
            Self::Retrieval(_) => TurnStage::Retrieving,
            Self::Generation(_) => TurnStage::Generating,
        }
    }
}

/// How the retrieval query was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    /// Target-language input was used as-is.
    Original,
    /// Source-language input was rewritten by the model.
    Rewritten,
    /// Rewrite failed and the original input was used instead.
    FallbackOriginal,
}

/// Retrieval query chosen for a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedQuery {
    /// Text sent to the retriever.
    pub text: String,
    /// How the text was chosen.
    pub source: QuerySource,
}

/// Everything a successful turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Sniffed language of the input.
    pub language: Language,
    /// Query used for retrieval.
    pub query: ResolvedQuery,
    /// Retrieved reference chunks, best first.
    pub context: Vec<RetrievedChunk>,
    /// Fully rendered generation prompt.
    pub prompt: String,
    /// Trimmed model answer.
    pub translation: String,
}

/// Model and sampling parameters for a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Generation model used for both rewrite and translation.
    pub generation_model: String,
    /// Temperature of the final translation call.
    pub generation_temperature: f32,
    /// Temperature of the rewrite call.
    pub rewrite_temperature: f32,
    /// Number of chunks retrieved per turn.
    pub top_k: usize,
    /// Language names and sniffing charset.
    pub languages: LanguagePair,
}

/// Retrieval-augmented translation over injected clients.
pub struct TranslationPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    generator: Arc<dyn GenerationClient>,
    store: Arc<dyn VectorStore>,
    template: PromptTemplate,
    metrics: Arc<PipelineMetrics>,
    settings: PipelineSettings,
}

impl TranslationPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        generator: Arc<dyn GenerationClient>,
        store: Arc<dyn VectorStore>,
        template: PromptTemplate,
        metrics: Arc<PipelineMetrics>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            generator,
            store,
            template,
            metrics,
            settings,
        }
    }

    /// Shared metrics registry.
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Ask the model to translate source-language input for retrieval.
    pub async fn rewrite_query(&self, input: &str) -> Result<String, RewriteFailure> {
        let prompt = rewrite_prompt(input, &self.settings.languages);
        let text = self
            .generator
            .generate(GenerationRequest {
                model: self.settings.generation_model.clone(),
                prompt,
                temperature: self.settings.rewrite_temperature,
            })
            .await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RewriteFailure(GenerationClientError::EmptyResponse));
        }
        Ok(trimmed.to_string())
    }

    /// Pick the retrieval query for `input`, falling back to the input on rewrite failure.
    pub async fn resolve_query(&self, input: &str, language: Language) -> ResolvedQuery {
        if language == Language::Target {
            return ResolvedQuery {
                text: input.to_string(),
                source: QuerySource::Original,
            };
        }

        tracing::debug!(stage = ?TurnStage::RewritingQuery, "Rewriting query");
        match self.rewrite_query(input).await {
            Ok(rewritten) => {
                self.metrics.record_rewrite(false);
                tracing::debug!(query = %rewritten, "Query rewritten for retrieval");
                ResolvedQuery {
                    text: rewritten,
                    source: QuerySource::Rewritten,
                }
            }
            Err(error) => {
                self.metrics.record_rewrite(true);
                tracing::warn!(%error, "Query rewrite failed; retrieving with original input");
                ResolvedQuery {
                    text: input.to_string(),
                    source: QuerySource::FallbackOriginal,
                }
            }
        }
    }

    /// Embed `query` and return the closest chunks.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let vector = self
            .embedder
            .generate_embeddings(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .filter(|vector| !vector.is_empty())
            .ok_or(RetrievalError::EmptyEmbedding)?;
        let hits = self.store.search(&vector, self.settings.top_k).await?;
        tracing::debug!(hits = hits.len(), top_k = self.settings.top_k, "Retrieved context");
        Ok(hits)
    }

    /// Render the generation prompt for the original input and retrieved chunks.
    pub fn render_prompt(&self, input: &str, context: &[RetrievedChunk]) -> String {
        let texts: Vec<&str> = context.iter().map(|chunk| chunk.text.as_str()).collect();
        let context = format_context(&texts);
        self.template.render(PromptFields {
            context: &context,
            question: input,
        })
    }

    /// Run one full turn.
    pub async fn translate(&self, input: &str) -> Result<TurnOutcome, PipelineFailure> {
        let language = sniff_language(input, &self.settings.languages.source_charset);
        tracing::info!(?language, "Translation turn started");

        let query = self.resolve_query(input, language).await;

        tracing::debug!(stage = ?TurnStage::Retrieving, "Retrieving context");
        let context = self.retrieve(&query.text).await?;

        tracing::debug!(stage = ?TurnStage::Rendering, "Rendering prompt");
        let prompt = self.render_prompt(input, &context);

        tracing::debug!(stage = ?TurnStage::Generating, "Generating translation");
        let raw = self
            .generator
            .generate(GenerationRequest {
                model: self.settings.generation_model.clone(),
                prompt: prompt.clone(),
                temperature: self.settings.generation_temperature,
            })
            .await?;
        let translation = raw.trim().to_string();
        if translation.is_empty() {
            return Err(PipelineFailure::Generation(
                GenerationClientError::EmptyResponse,
            ));
        }

        tracing::info!(
            stage = ?TurnStage::Done,
            query_source = ?query.source,
            context_chunks = context.len(),
            "Translation turn finished"
        );
        Ok(TurnOutcome {
            language,
            query,
            context,
            prompt,
            translation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IndexEntry, IndexManifest};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Replies from a script and records every request.
    #[derive(Default)]
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, GenerationClientError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, GenerationClientError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedGenerator {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<String, GenerationClientError> {
            self.requests.lock().await.push(request);
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(GenerationClientError::EmptyResponse))
        }
    }

    /// Records the query it was asked to embed.
    #[derive(Default)]
    struct RecordingEmbedder {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingClient for RecordingEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            if self.fail {
                return Err(EmbeddingClientError::ProviderUnavailable("offline".into()));
            }
            self.queries.lock().await.extend(texts.iter().cloned());
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FixedStore(Vec<RetrievedChunk>);

    #[async_trait]
    impl VectorStore for FixedStore {
        fn location(&self) -> String {
            "fixed".into()
        }
        async fn exists(&self) -> Result<bool, StoreError> {
            Ok(true)
        }
        async fn replace(
            &self,
            _manifest: IndexManifest,
            _entries: Vec<IndexEntry>,
        ) -> Result<(), StoreError> {
            Ok(())
        }
        async fn manifest(&self) -> Result<IndexManifest, StoreError> {
            Ok(IndexManifest::new("hashed", "byte-hash", 2, self.0.len()))
        }
        async fn search(
            &self,
            _vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<RetrievedChunk>, StoreError> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    fn chunk(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: text.into(),
            score: 0.9,
        }
    }

    fn pipeline(
        embedder: Arc<RecordingEmbedder>,
        generator: Arc<ScriptedGenerator>,
    ) -> TranslationPipeline {
        let languages = LanguagePair::default();
        TranslationPipeline::new(
            embedder,
            generator,
            Arc::new(FixedStore(vec![
                chunk("English: Good morning.\nTurkish: Günaydın."),
                chunk("English: Good night.\nTurkish: İyi geceler."),
            ])),
            PromptTemplate::parse("CTX[{context}] Q[{question}]").expect("template"),
            Arc::new(PipelineMetrics::new()),
            PipelineSettings {
                generation_model: "model".into(),
                generation_temperature: 0.3,
                rewrite_temperature: 0.2,
                top_k: 5,
                languages,
            },
        )
    }

    #[tokio::test]
    async fn source_input_is_rewritten_but_question_stays_original() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(" Good morning \n".into()),
            Ok("  Good morning.  ".into()),
        ]));
        let pipeline = pipeline(embedder.clone(), generator.clone());

        let outcome = pipeline.translate("Günaydın").await.expect("turn");

        assert_eq!(outcome.language, Language::Source);
        assert_eq!(outcome.query.source, QuerySource::Rewritten);
        assert_eq!(*embedder.queries.lock().await, vec!["Good morning"]);
        assert_eq!(outcome.translation, "Good morning.");

        let requests = generator.requests.lock().await;
        assert_eq!(requests.len(), 2);
        assert!((requests[0].temperature - 0.2).abs() < f32::EPSILON);
        assert!(requests[0].prompt.ends_with("Günaydın"));
        assert!((requests[1].temperature - 0.3).abs() < f32::EPSILON);
        assert!(requests[1].prompt.ends_with("Q[Günaydın]"));
        assert!(requests[1].prompt.contains(
            "English: Good morning.\nTurkish: Günaydın.\n\nEnglish: Good night.\nTurkish: İyi geceler."
        ));
    }

    #[tokio::test]
    async fn target_input_skips_the_rewrite() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok("Günaydın".into())]));
        let pipeline = pipeline(embedder.clone(), generator.clone());

        let outcome = pipeline.translate("Good morning").await.expect("turn");

        assert_eq!(outcome.language, Language::Target);
        assert_eq!(outcome.query.source, QuerySource::Original);
        assert_eq!(outcome.query.text, "Good morning");
        assert_eq!(*embedder.queries.lock().await, vec!["Good morning"]);
        assert_eq!(generator.requests.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn rewrite_failure_falls_back_to_original_input() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(GenerationClientError::GenerationFailed("quota".into())),
            Ok("Good morning".into()),
        ]));
        let pipeline = pipeline(embedder.clone(), generator);

        let outcome = pipeline.translate("Günaydın").await.expect("turn");

        assert_eq!(outcome.query.source, QuerySource::FallbackOriginal);
        assert_eq!(*embedder.queries.lock().await, vec!["Günaydın"]);
        let snapshot = pipeline.metrics().snapshot();
        assert_eq!(snapshot.rewrites, 1);
        assert_eq!(snapshot.rewrite_fallbacks, 1);
    }

    #[tokio::test]
    async fn blank_rewrite_counts_as_failure() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok("   ".into()),
            Ok("Good morning".into()),
        ]));
        let pipeline = pipeline(embedder.clone(), generator);

        let outcome = pipeline.translate("Günaydın").await.expect("turn");
        assert_eq!(outcome.query.text, "Günaydın");
        assert_eq!(outcome.query.source, QuerySource::FallbackOriginal);
    }

    #[tokio::test]
    async fn retrieval_failure_is_reported_with_its_stage() {
        let embedder = Arc::new(RecordingEmbedder {
            fail: true,
            ..Default::default()
        });
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let pipeline = pipeline(embedder, generator.clone());

        let error = pipeline.translate("Good morning").await.expect_err("fail");
        assert!(matches!(error, PipelineFailure::Retrieval(_)));
        assert_eq!(error.stage(), TurnStage::Retrieving);
        assert!(generator.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn empty_generation_is_a_failure() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(" \n ".into())]));
        let pipeline = pipeline(embedder, generator);

        let error = pipeline.translate("Good morning").await.expect_err("empty");
        assert_eq!(error.stage(), TurnStage::Generating);
    }
}
