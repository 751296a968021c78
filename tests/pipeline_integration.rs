//! End-to-end ingestion and translation turns over the offline hashed embedder, a local index in
//! a temporary directory, and a scripted generation model.

use std::{collections::VecDeque, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use rustytranslate::{
    corpus::ColumnOrder,
    embedding::{EmbeddingClient, EmbeddingClientError, HashedEmbeddingClient},
    generation::{GenerationClient, GenerationClientError, GenerationRequest},
    metrics::PipelineMetrics,
    processing::{IngestionService, IngestionSettings, chunking::ChunkerConfig},
    store::{LocalVectorStore, VectorStore},
    translation::{
        ChatSession, Language, LanguagePair, PipelineSettings, PromptTemplate, QuerySource, Role,
        TranslationPipeline, TurnReply, TurnStage,
    },
};
use tokio::sync::Mutex;
use uuid::Uuid;

const DIMENSION: usize = 64;

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("rusty-translate-it-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).expect("create temp dir");
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

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
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        self.requests.lock().await.push(request);
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(GenerationClientError::EmptyResponse))
    }
}

/// Hashed embeddings that also record every text embedded at query time.
struct RecordingEmbedder {
    inner: HashedEmbeddingClient,
    seen: Mutex<Vec<String>>,
    fail_next: Mutex<bool>,
}

impl RecordingEmbedder {
    fn new() -> Self {
        Self {
            inner: HashedEmbeddingClient::new(DIMENSION),
            seen: Mutex::new(Vec::new()),
            fail_next: Mutex::new(false),
        }
    }
}

#[async_trait]
impl EmbeddingClient for RecordingEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let mut fail = self.fail_next.lock().await;
        if *fail {
            *fail = false;
            return Err(EmbeddingClientError::ProviderUnavailable(
                "embedding service offline".into(),
            ));
        }
        self.seen.lock().await.extend(texts.iter().cloned());
        self.inner.generate_embeddings(texts).await
    }
}

fn write_corpus(dir: &TempDir, lines: usize) -> PathBuf {
    let mut corpus = String::from("Good morning.\tGünaydın.\nThank you.\tTeşekkür ederim.\n");
    corpus.push_str("this line has no tab\n");
    for n in 0..lines {
        corpus.push_str(&format!("Sentence number {n}.\tCümle numarası {n}.\n"));
    }
    let path = dir.0.join("TR2EN.txt");
    std::fs::write(&path, corpus).expect("write corpus");
    path
}

fn ingestion_settings(max_pairs: usize) -> IngestionSettings {
    IngestionSettings {
        chunker: ChunkerConfig::new(800, 150).expect("chunker"),
        batch_size: 100,
        max_pairs,
        column_order: ColumnOrder::TargetFirst,
        languages: LanguagePair::default(),
        embedding_provider: "hashed".into(),
        embedding_model: "byte-hash".into(),
        dimension: DIMENSION,
        force: false,
    }
}

async fn build_index(dir: &TempDir, corpus_lines: usize, max_pairs: usize) -> Arc<LocalVectorStore> {
    let store = Arc::new(LocalVectorStore::new(dir.0.join("translation_index")));
    let service = IngestionService::new(
        Arc::new(HashedEmbeddingClient::new(DIMENSION)),
        store.clone(),
        Arc::new(PipelineMetrics::new()),
        ingestion_settings(max_pairs),
    );
    service
        .ingest_file(&write_corpus(dir, corpus_lines))
        .await
        .expect("ingestion");
    store
}

fn pipeline(
    store: Arc<LocalVectorStore>,
    embedder: Arc<RecordingEmbedder>,
    generator: Arc<ScriptedGenerator>,
) -> Arc<TranslationPipeline> {
    let languages = LanguagePair::default();
    Arc::new(TranslationPipeline::new(
        embedder,
        generator,
        store,
        PromptTemplate::translation_default(&languages),
        Arc::new(PipelineMetrics::new()),
        PipelineSettings {
            generation_model: "scripted".into(),
            generation_temperature: 0.3,
            rewrite_temperature: 0.2,
            top_k: 5,
            languages,
        },
    ))
}

#[tokio::test]
async fn ingestion_caps_pairs_and_skips_malformed_lines() {
    let dir = TempDir::new();
    let store = Arc::new(LocalVectorStore::new(dir.0.join("translation_index")));
    let service = IngestionService::new(
        Arc::new(HashedEmbeddingClient::new(DIMENSION)),
        store.clone(),
        Arc::new(PipelineMetrics::new()),
        ingestion_settings(1000),
    );

    let outcome = service
        .ingest_file(&write_corpus(&dir, 1200))
        .await
        .expect("ingestion");

    assert_eq!(outcome.pairs_parsed, 1202);
    assert_eq!(outcome.lines_skipped, 1);
    assert_eq!(outcome.pairs_indexed, 1000);
    assert_eq!(outcome.pairs_truncated, 202);
    assert!(outcome.chunks_indexed <= 1000);

    let manifest = store.manifest().await.expect("manifest");
    assert_eq!(manifest.entry_count, outcome.chunks_indexed);
    assert_eq!(manifest.dimension, DIMENSION);

    let rerun = service.ingest_file(&write_corpus(&dir, 10)).await;
    assert!(rerun.is_err(), "existing index must not be overwritten without force");
}

#[tokio::test]
async fn source_language_turn_rewrites_for_retrieval_only() {
    let dir = TempDir::new();
    // Five pairs in total, so every entry fits in the top-k context.
    let store = build_index(&dir, 3, 1000).await;
    let embedder = Arc::new(RecordingEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok("Good morning".into()),
        Ok("  Good morning.\n".into()),
    ]));
    let mut session = ChatSession::new(pipeline(store, embedder.clone(), generator.clone()));

    let reply = session.handle_turn("Günaydın").await;

    let TurnReply::Translated(outcome) = reply else {
        panic!("turn should succeed");
    };
    assert_eq!(outcome.language, Language::Source);
    assert_eq!(outcome.query.source, QuerySource::Rewritten);
    assert_eq!(outcome.translation, "Good morning.");
    assert_eq!(*embedder.seen.lock().await, vec!["Good morning"]);
    assert!(!outcome.context.is_empty());
    assert!(outcome.context.len() <= 5);

    let requests = generator.requests.lock().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[1].prompt.contains("QUESTION: Günaydın\n"));
    assert!(!requests[1].prompt.contains("QUESTION: Good morning"));
    assert!(requests[1].prompt.contains("English: Good morning.\nTurkish: Günaydın."));
}

#[tokio::test]
async fn target_language_turn_queries_with_the_input() {
    let dir = TempDir::new();
    let store = build_index(&dir, 20, 1000).await;
    let embedder = Arc::new(RecordingEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::new(vec![Ok("Günaydın.".into())]));
    let mut session = ChatSession::new(pipeline(store, embedder.clone(), generator.clone()));

    let reply = session.handle_turn("Good morning").await;

    let TurnReply::Translated(outcome) = reply else {
        panic!("turn should succeed");
    };
    assert_eq!(outcome.language, Language::Target);
    assert_eq!(outcome.query.text, "Good morning");
    assert_eq!(*embedder.seen.lock().await, vec!["Good morning"]);
    assert_eq!(generator.requests.lock().await.len(), 1);
    assert_eq!(outcome.translation, "Günaydın.");
}

#[tokio::test]
async fn failed_turn_is_shown_and_session_continues() {
    let dir = TempDir::new();
    let store = build_index(&dir, 5, 1000).await;
    let embedder = Arc::new(RecordingEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(GenerationClientError::GenerationFailed("model overloaded".into())),
        Ok("Teşekkür ederim.".into()),
    ]));
    let mut session = ChatSession::new(pipeline(store, embedder.clone(), generator));
    assert_eq!(session.last_outcome(), TurnStage::Idle);

    let first = session.handle_turn("Good morning").await;
    assert!(first.is_error());
    assert!(first.text().starts_with("Error: translation failed"));
    assert!(first.text().contains("model overloaded"));
    assert_eq!(session.last_outcome(), TurnStage::Error);

    *embedder.fail_next.lock().await = true;
    let second = session.handle_turn("Good night").await;
    assert!(matches!(
        second,
        TurnReply::Failed {
            stage: TurnStage::Retrieving,
            ..
        }
    ));

    let third = session.handle_turn("Thank you").await;
    assert!(!third.is_error());
    assert_eq!(third.text(), "Teşekkür ederim.");
    assert_eq!(session.last_outcome(), TurnStage::Done);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 6);
    assert_eq!(transcript[0].role, Role::User);
    assert!(transcript[1].is_error);
    assert!(transcript[3].is_error);
    assert!(!transcript[5].is_error);
}

#[tokio::test]
async fn rewrite_failure_retrieves_with_original_input() {
    let dir = TempDir::new();
    let store = build_index(&dir, 5, 1000).await;
    let embedder = Arc::new(RecordingEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(GenerationClientError::ProviderUnavailable("offline".into())),
        Ok("Good morning.".into()),
    ]));
    let pipeline = pipeline(store, embedder.clone(), generator);
    let mut session = ChatSession::new(pipeline.clone());

    let reply = session.handle_turn("Günaydın").await;

    assert!(!reply.is_error());
    assert_eq!(*embedder.seen.lock().await, vec!["Günaydın"]);
    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.rewrite_fallbacks, 1);
    assert_eq!(snapshot.turns, 1);
    assert_eq!(snapshot.failed_turns, 0);
}
