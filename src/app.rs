//! Startup wiring shared by the binaries: build every service once from [`Config`].

use crate::{
    config::{Config, ConfigError},
    corpus::CorpusError,
    embedding::{EmbeddingClientError, build_embedding_client},
    generation::{GenerationClientError, build_generation_client},
    metrics::PipelineMetrics,
    processing::{ChunkingError, IngestionService, IngestionSettings},
    store::{StoreError, VectorStore, open_store},
    translation::{PipelineSettings, PromptTemplate, TemplateError, TranslationPipeline},
};
use std::sync::Arc;
use thiserror::Error;

/// Fatal problems detected before the first query is served.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Embedding client could not be built.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Generation client could not be built.
    #[error(transparent)]
    Generation(#[from] GenerationClientError),
    /// Vector store could not be opened or read.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Custom prompt template is invalid.
    #[error("invalid prompt template: {0}")]
    Template(#[from] TemplateError),
    /// Chunking parameters are invalid.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// Corpus could not be located.
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    /// Index was built with vectors of another size than the configured model produces.
    #[error(
        "index at {location} holds {index_dimension}-dimensional vectors but the configured \
         embedding model produces {configured_dimension}; rebuild it with --force"
    )]
    IncompatibleIndex {
        /// Store location.
        location: String,
        /// Dimension recorded in the manifest.
        index_dimension: usize,
        /// Dimension from the configuration.
        configured_dimension: usize,
    },
}

/// Load the prompt template from `PROMPT_TEMPLATE_PATH`, or use the built-in one.
pub fn load_template(config: &Config) -> Result<PromptTemplate, TemplateError> {
    match &config.prompt_template_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading custom prompt template");
            PromptTemplate::load(path)
        }
        None => Ok(PromptTemplate::translation_default(&config.languages)),
    }
}

/// Check that an existing index can be queried with the configured embedding model.
///
/// A different model name only warns; a different vector size is fatal.
pub async fn verify_index(store: &dyn VectorStore, config: &Config) -> Result<(), SetupError> {
    let manifest = store.manifest().await?;
    if manifest.dimension != config.embedding_dimension {
        return Err(SetupError::IncompatibleIndex {
            location: store.location(),
            index_dimension: manifest.dimension,
            configured_dimension: config.embedding_dimension,
        });
    }
    if !manifest.matches_model(config.embedding_provider.as_str(), &config.embedding_model) {
        tracing::warn!(
            index_provider = %manifest.embedding_provider,
            index_model = %manifest.embedding_model,
            configured_provider = config.embedding_provider.as_str(),
            configured_model = %config.embedding_model,
            "Index was built with a different embedding model; retrieval quality may suffer"
        );
    }
    tracing::info!(
        location = %store.location(),
        entries = manifest.entry_count,
        created_at = %manifest.created_at,
        "Index ready"
    );
    Ok(())
}

/// Build the query-time pipeline and verify that its index is usable.
pub async fn build_pipeline(
    config: &Config,
    metrics: Arc<PipelineMetrics>,
) -> Result<TranslationPipeline, SetupError> {
    let store = open_store(config)?;
    verify_index(store.as_ref(), config).await?;

    let embedder = build_embedding_client(config)?;
    let generator = build_generation_client(config)?;
    let template = load_template(config)?;

    tracing::info!(
        embedding_provider = config.embedding_provider.as_str(),
        generation_model = %config.generation_model,
        top_k = config.retrieval_top_k,
        "Translation pipeline ready"
    );
    Ok(TranslationPipeline::new(
        embedder,
        generator,
        store,
        template,
        metrics,
        PipelineSettings {
            generation_model: config.generation_model.clone(),
            generation_temperature: config.generation_temperature,
            rewrite_temperature: config.rewrite_temperature,
            top_k: config.retrieval_top_k,
            languages: config.languages.clone(),
        },
    ))
}

/// Build the ingestion service for the configured embedder and store.
pub fn build_ingestion(
    config: &Config,
    metrics: Arc<PipelineMetrics>,
    force: bool,
) -> Result<IngestionService, SetupError> {
    let settings = IngestionSettings::from_config(config, force)?;
    Ok(IngestionService::new(
        build_embedding_client(config)?,
        open_store(config)?,
        metrics,
        settings,
    ))
}
