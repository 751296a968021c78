//! Chunk preparation helpers: hashing and in-run dedupe.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Chunk text with associated hash ready for embedding.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunk {
    /// Chunk text content.
    pub(crate) text: String,
    /// Stable digest used for dedupe and as the entry identifier.
    pub(crate) chunk_hash: String,
    /// Index of the rendered pair the chunk came from.
    pub(crate) pair_index: usize,
}

/// Stable SHA-256 hex digest of a chunk's text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Remove duplicate chunks, keeping the first occurrence.
pub(crate) fn dedupe_chunks(chunks: Vec<(usize, String)>) -> (Vec<PreparedChunk>, usize) {
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    let mut skipped = 0;

    for (pair_index, text) in chunks {
        if text.trim().is_empty() {
            continue;
        }
        let hash = compute_chunk_hash(&text);
        if seen.insert(hash.clone()) {
            prepared.push(PreparedChunk {
                text,
                chunk_hash: hash,
                pair_index,
            });
        } else {
            skipped += 1;
        }
    }

    (prepared, skipped)
}
