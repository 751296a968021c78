//! Ingestion service coordinating parsing, chunking, embedding, and the index write.

use crate::{
    config::Config,
    corpus::{ColumnOrder, ParsedCorpus, cap_pairs, parse_corpus, render_pair},
    embedding::EmbeddingClient,
    metrics::PipelineMetrics,
    processing::{
        chunking::{ChunkerConfig, OversizedToken, chunk_text},
        mappers::{PreparedChunk, dedupe_chunks},
        types::{ChunkingError, IngestOutcome, IngestionError},
    },
    store::{IndexEntry, IndexManifest, VectorStore},
    translation::language::LanguagePair,
};
use std::{path::Path, sync::Arc};

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionSettings {
    /// Chunk size, overlap, and oversized-token policy.
    pub chunker: ChunkerConfig,
    /// Texts submitted per embedding request.
    pub batch_size: usize,
    /// Pair cap; `0` disables it.
    pub max_pairs: usize,
    /// Which corpus column holds which language.
    pub column_order: ColumnOrder,
    /// Language names used when rendering pairs.
    pub languages: LanguagePair,
    /// Embedding provider name recorded in the manifest.
    pub embedding_provider: String,
    /// Embedding model recorded in the manifest.
    pub embedding_model: String,
    /// Expected vector dimension.
    pub dimension: usize,
    /// Overwrite an existing index.
    pub force: bool,
}

impl IngestionSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config, force: bool) -> Result<Self, ChunkingError> {
        let oversized = if config.chunk_split_oversized {
            OversizedToken::Split
        } else {
            OversizedToken::KeepWhole
        };
        Ok(Self {
            chunker: ChunkerConfig::new(config.chunk_size, config.chunk_overlap)?
                .with_oversized(oversized),
            batch_size: config.embedding_batch_size.max(1),
            max_pairs: config.corpus.max_pairs,
            column_order: config.corpus.column_order,
            languages: config.languages.clone(),
            embedding_provider: config.embedding_provider.as_str().to_string(),
            embedding_model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
            force,
        })
    }
}

/// Builds the translation-pair index from a corpus.
///
/// The whole corpus is embedded before the store is touched, so any embedding failure aborts the
/// run without writing (or destroying) an index.
pub struct IngestionService {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    metrics: Arc<PipelineMetrics>,
    settings: IngestionSettings,
}

impl IngestionService {
    /// Assemble a service from its collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        metrics: Arc<PipelineMetrics>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            metrics,
            settings,
        }
    }

    /// Read, parse, and index a corpus file.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestOutcome, IngestionError> {
        tracing::info!(path = %path.display(), "Reading corpus");
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| IngestionError::ReadCorpus {
                path: path.to_path_buf(),
                source,
            })?;
        let parsed = parse_corpus(bytes.as_slice(), self.settings.column_order).map_err(
            |source| IngestionError::ReadCorpus {
                path: path.to_path_buf(),
                source,
            },
        )?;
        self.ingest_parsed(parsed).await
    }

    /// Index already-parsed pairs.
    pub async fn ingest_parsed(
        &self,
        parsed: ParsedCorpus,
    ) -> Result<IngestOutcome, IngestionError> {
        if !self.settings.force && self.store.exists().await? {
            return Err(IngestionError::IndexExists(self.store.location()));
        }

        let ParsedCorpus {
            mut pairs,
            skipped_lines,
        } = parsed;
        let pairs_parsed = pairs.len();
        if skipped_lines > 0 {
            tracing::info!(skipped_lines, "Skipped malformed corpus lines");
        }
        if pairs.is_empty() {
            return Err(IngestionError::EmptyCorpus);
        }
        let pairs_truncated = cap_pairs(&mut pairs, self.settings.max_pairs);

        let chunks: Vec<(usize, String)> = pairs
            .iter()
            .enumerate()
            .flat_map(|(pair_index, pair)| {
                let rendered = render_pair(pair, &self.settings.languages);
                chunk_text(&rendered, &self.settings.chunker)
                    .into_iter()
                    .map(move |chunk| (pair_index, chunk))
            })
            .collect();
        let (prepared, skipped_duplicates) = dedupe_chunks(chunks);
        tracing::info!(
            pairs = pairs.len(),
            chunks = prepared.len(),
            skipped_duplicates,
            "Corpus chunked"
        );

        let entries = self.embed_all(prepared).await?;
        let manifest = IndexManifest::new(
            self.settings.embedding_provider.clone(),
            self.settings.embedding_model.clone(),
            self.settings.dimension,
            entries.len(),
        );
        let chunks_indexed = entries.len();
        self.store.replace(manifest, entries).await?;

        self.metrics
            .record_ingestion(pairs.len() as u64, chunks_indexed as u64);
        let outcome = IngestOutcome {
            pairs_parsed,
            lines_skipped: skipped_lines,
            pairs_truncated,
            pairs_indexed: pairs.len(),
            chunks_indexed,
            skipped_duplicates,
        };
        tracing::info!(
            location = %self.store.location(),
            pairs = outcome.pairs_indexed,
            chunks = outcome.chunks_indexed,
            "Index built"
        );
        Ok(outcome)
    }

    async fn embed_all(
        &self,
        prepared: Vec<PreparedChunk>,
    ) -> Result<Vec<IndexEntry>, IngestionError> {
        let total_batches = prepared.len().div_ceil(self.settings.batch_size);
        let mut entries = Vec::with_capacity(prepared.len());

        for (batch_index, batch) in prepared.chunks(self.settings.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = self.embedder.generate_embeddings(texts).await?;
            if vectors.len() != batch.len() {
                return Err(IngestionError::EmbeddingCountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }
            tracing::debug!(
                batch = batch_index + 1,
                total_batches,
                size = batch.len(),
                "Embedded batch"
            );

            for (chunk, vector) in batch.iter().zip(vectors) {
                if vector.len() != self.settings.dimension {
                    return Err(IngestionError::DimensionMismatch {
                        expected: self.settings.dimension,
                        actual: vector.len(),
                    });
                }
                entries.push(IndexEntry {
                    id: chunk.chunk_hash.clone(),
                    text: chunk.text.clone(),
                    pair_index: chunk.pair_index,
                    vector,
                });
            }
        }

        Ok(entries)
    }
}
