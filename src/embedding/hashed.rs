use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;

/// Deterministic offline embedding client.
///
/// Lowercased bytes of the input are counted into a fixed number of slots and the result is L2-normalised.
/// Texts sharing many bytes land near each other, which is enough for smoke tests and for
/// running the whole pipeline without provider credentials. It carries no semantics.
#[derive(Debug, Clone)]
pub struct HashedEmbeddingClient {
    dimension: usize,
}

impl HashedEmbeddingClient {
    /// Construct a client producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        let normalized = text.to_lowercase();

        for byte in normalized.bytes() {
            embedding[usize::from(byte) % self.dimension] += 1.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashedEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        tracing::trace!(count = texts.len(), dimension = self.dimension, "Hashing texts");
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}
