#![deny(missing_docs)]

//! Core library for Rusty Translate, a retrieval-augmented translation assistant.

/// HTTP routing and REST handlers.
pub mod api;
/// Startup wiring shared by the binaries.
pub mod app;
/// Environment-driven configuration management.
pub mod config;
/// Parallel corpus location, download, and parsing.
pub mod corpus;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text generation client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline counters.
pub mod metrics;
/// Corpus ingestion pipeline.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Vector index abstraction and the local file backend.
pub mod store;
/// Query-time translation pipeline and chat session.
pub mod translation;
