//! Ingestion pipeline: parsed pairs are rendered, chunked, embedded, and written to the index.

pub mod chunking;
mod mappers;
mod service;
pub mod types;

pub use mappers::compute_chunk_hash;
pub use service::{IngestionService, IngestionSettings};
pub use types::{ChunkingError, IngestOutcome, IngestionError};
