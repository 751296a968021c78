//! Vector index abstraction shared by ingestion and retrieval.
//!
//! An index is a set of `(chunk text, embedding)` entries plus an [`IndexManifest`] recording the
//! embedding provider, model, and dimension that produced it. Ingestion replaces the whole index
//! in one call; retrieval performs nearest-neighbour search by cosine similarity.

pub mod local;

pub use local::LocalVectorStore;

use crate::{
    config::{Config, VectorBackend},
    qdrant::{QdrantError, QdrantStore},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised by vector store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Stored data could not be encoded or decoded.
    #[error("Corrupt index data: {0}")]
    Serialization(#[from] serde_json::Error),
    /// No index has been built at the configured location.
    #[error("No index found at {0}; run the ingestion command first")]
    MissingIndex(String),
    /// Query or entry vector does not match the index dimension.
    #[error("Vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension recorded by the index.
        expected: usize,
        /// Dimension supplied by the caller.
        actual: usize,
    },
    /// Remote Qdrant backend failed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
}

/// One embedded chunk stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Stable identifier (the chunk's content hash).
    pub id: String,
    /// Chunk text returned to the prompt on retrieval.
    pub text: String,
    /// Index of the rendered pair the chunk came from.
    pub pair_index: usize,
    /// Embedding vector.
    pub vector: Vec<f32>,
}

/// Provenance of an index: which embedding model built it and how large it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding provider name (`gemini`, `openai`, `ollama`, `hashed`).
    pub embedding_provider: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Vector dimension shared by every entry.
    pub dimension: usize,
    /// Number of entries written.
    pub entry_count: usize,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl IndexManifest {
    /// Describe a freshly built index, stamped with the current time.
    pub fn new(
        embedding_provider: impl Into<String>,
        embedding_model: impl Into<String>,
        dimension: usize,
        entry_count: usize,
    ) -> Self {
        Self {
            embedding_provider: embedding_provider.into(),
            embedding_model: embedding_model.into(),
            dimension,
            entry_count,
            created_at: current_timestamp_rfc3339(),
        }
    }

    /// Whether the index was built by the given provider and model.
    pub fn matches_model(&self, provider: &str, model: &str) -> bool {
        self.embedding_provider == provider && self.embedding_model == model
    }
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// Chunk text.
    pub text: String,
    /// Cosine similarity to the query, higher is closer.
    pub score: f32,
}

/// Persistent nearest-neighbour index over embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Human-readable location used in logs and error messages.
    fn location(&self) -> String;

    /// Whether an index is already present.
    async fn exists(&self) -> Result<bool, StoreError>;

    /// Replace any existing index with `entries`. Readers never observe a partial index on the
    /// local backend.
    async fn replace(
        &self,
        manifest: IndexManifest,
        entries: Vec<IndexEntry>,
    ) -> Result<(), StoreError>;

    /// Read the manifest of the current index.
    async fn manifest(&self) -> Result<IndexManifest, StoreError>;

    /// Return up to `top_k` entries most similar to `vector`, best first.
    async fn search(&self, vector: &[f32], top_k: usize)
    -> Result<Vec<RetrievedChunk>, StoreError>;
}

/// Open the vector store selected by the configuration.
pub fn open_store(config: &Config) -> Result<Arc<dyn VectorStore>, StoreError> {
    let store: Arc<dyn VectorStore> = match config.vector_backend {
        VectorBackend::Local => Arc::new(LocalVectorStore::new(&config.index_path)),
        VectorBackend::Qdrant => Arc::new(QdrantStore::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
            &config.qdrant_collection_name,
        )?),
    };
    tracing::debug!(location = %store.location(), "Opened vector store");
    Ok(store)
}

/// Cosine similarity of two equal-length vectors; zero when either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
