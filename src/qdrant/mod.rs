//! Qdrant vector store integration.

pub mod client;
pub mod store;
pub mod types;

pub use client::QdrantService;
pub use store::QdrantStore;
pub use types::{CollectionStats, QdrantError, ScoredPoint};
