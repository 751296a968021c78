//! Core data types and error definitions for the ingestion pipeline.

use crate::{corpus::CorpusError, embedding::EmbeddingClientError, store::StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while configuring the chunker.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would leave no room for new content in each chunk.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested chunk size in characters.
        chunk_size: usize,
    },
}

/// Errors that abort an ingestion run. No index is written when one of these is returned.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Corpus could not be located, downloaded, or read.
    #[error("Failed to load corpus: {0}")]
    Corpus(#[from] CorpusError),
    /// Corpus file could not be read.
    #[error("Failed to read corpus file {}: {source}", .path.display())]
    ReadCorpus {
        /// Corpus file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Chunker configuration was rejected.
    #[error("Failed to chunk corpus: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed for at least one batch.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Provider returned a different number of vectors than texts submitted.
    #[error("Embedding provider returned {actual} vectors for {expected} chunks")]
    EmbeddingCountMismatch {
        /// Number of texts submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// Returned vector size does not match the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured embedding dimension.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
    /// Vector store rejected the write or the existence probe.
    #[error("Vector store request failed: {0}")]
    Store(#[from] StoreError),
    /// An index already exists and overwriting was not requested.
    #[error("An index already exists at {0}; pass --force to rebuild it")]
    IndexExists(String),
    /// Corpus produced no usable pairs.
    #[error("Corpus contained no tab-separated translation pairs")]
    EmptyCorpus,
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Pairs parsed from the corpus before capping.
    pub pairs_parsed: usize,
    /// Lines dropped because they did not contain exactly two fields.
    pub lines_skipped: usize,
    /// Pairs dropped by the pair cap.
    pub pairs_truncated: usize,
    /// Pairs rendered and chunked.
    pub pairs_indexed: usize,
    /// Chunks written to the index.
    pub chunks_indexed: usize,
    /// Identical chunks skipped within the run.
    pub skipped_duplicates: usize,
}
