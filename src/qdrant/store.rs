//! [`VectorStore`] implementation backed by a Qdrant collection.
//!
//! Each entry becomes one point with a random UUID id and a payload carrying the chunk text, its
//! hash, the source pair index, and the manifest fields. A collection without points is treated as
//! a missing index. Replacing the index drops and recreates
//! the collection, so unlike the local backend a failed upload can leave it partially filled.

use super::{QdrantError, QdrantService};
use crate::store::{IndexEntry, IndexManifest, RetrievedChunk, StoreError, VectorStore};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use uuid::Uuid;

const UPSERT_BATCH: usize = 256;

/// Vector store persisted in a Qdrant collection.
pub struct QdrantStore {
    service: QdrantService,
    collection: String,
}

impl QdrantStore {
    /// Open the named collection on the Qdrant instance at `url`.
    pub fn new(url: &str, api_key: Option<String>, collection: &str) -> Result<Self, QdrantError> {
        Ok(Self::with_service(QdrantService::new(url, api_key)?, collection))
    }

    /// Wrap an existing client.
    pub fn with_service(service: QdrantService, collection: &str) -> Self {
        Self {
            service,
            collection: collection.to_string(),
        }
    }
}

fn point_payload(entry: &IndexEntry, manifest: &IndexManifest) -> Value {
    json!({
        "text": entry.text,
        "chunk_hash": entry.id,
        "pair_index": entry.pair_index,
        "embedding_provider": manifest.embedding_provider,
        "embedding_model": manifest.embedding_model,
        "dimension": manifest.dimension,
        "created_at": manifest.created_at,
    })
}

fn payload_str(payload: &Map<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn location(&self) -> String {
        format!("{}collections/{}", ensure_trailing_slash(&self.service.base_url), self.collection)
    }

    async fn exists(&self) -> Result<bool, StoreError> {
        if !self.service.collection_exists(&self.collection).await? {
            return Ok(false);
        }
        Ok(self.service.collection_stats(&self.collection).await?.points_count > 0)
    }

    async fn replace(
        &self,
        manifest: IndexManifest,
        entries: Vec<IndexEntry>,
    ) -> Result<(), StoreError> {
        if let Some(entry) = entries
            .iter()
            .find(|entry| entry.vector.len() != manifest.dimension)
        {
            return Err(StoreError::DimensionMismatch {
                expected: manifest.dimension,
                actual: entry.vector.len(),
            });
        }

        self.service.delete_collection(&self.collection).await?;
        self.service
            .create_collection(&self.collection, manifest.dimension)
            .await?;

        for batch in entries.chunks(UPSERT_BATCH) {
            let points = batch
                .iter()
                .map(|entry| {
                    json!({
                        "id": Uuid::new_v4().to_string(),
                        "vector": entry.vector,
                        "payload": point_payload(entry, &manifest),
                    })
                })
                .collect();
            self.service.upsert_points(&self.collection, points).await?;
        }

        tracing::info!(
            collection = %self.collection,
            entries = entries.len(),
            dimension = manifest.dimension,
            "Qdrant index written"
        );
        Ok(())
    }

    async fn manifest(&self) -> Result<IndexManifest, StoreError> {
        if !self.service.collection_exists(&self.collection).await? {
            return Err(StoreError::MissingIndex(self.location()));
        }
        let stats = self.service.collection_stats(&self.collection).await?;
        if stats.points_count == 0 {
            return Err(StoreError::MissingIndex(self.location()));
        }
        let payload = self
            .service
            .first_payload(&self.collection)
            .await?
            .unwrap_or_default();
        // Named-vector collections report no single size; fall back to the payload copy.
        let dimension = stats
            .vector_size
            .or_else(|| {
                payload
                    .get("dimension")
                    .and_then(Value::as_u64)
                    .and_then(|size| usize::try_from(size).ok())
            })
            .ok_or_else(|| StoreError::MissingIndex(self.location()))?;

        Ok(IndexManifest {
            embedding_provider: payload_str(&payload, "embedding_provider"),
            embedding_model: payload_str(&payload, "embedding_model"),
            dimension,
            entry_count: stats.points_count,
            created_at: payload_str(&payload, "created_at"),
        })
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let points = match self
            .service
            .search_points(&self.collection, vector, top_k)
            .await
        {
            Ok(points) => points,
            Err(QdrantError::UnexpectedStatus { status, .. })
                if status == reqwest::StatusCode::NOT_FOUND =>
            {
                return Err(StoreError::MissingIndex(self.location()));
            }
            Err(error) => return Err(error.into()),
        };

        Ok(points
            .into_iter()
            .filter_map(|point| {
                let text = point.payload.as_ref()?.get("text")?.as_str()?.to_string();
                Some(RetrievedChunk {
                    text,
                    score: point.score,
                })
            })
            .collect())
    }
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
