//! Recursive character chunking.
//!
//! Text is split with a separator preference list (paragraph breaks, line breaks, spaces) and the
//! resulting pieces are merged greedily back into fragments of at most `chunk_size` characters.
//! Each new fragment is seeded with the trailing pieces of the previous one, up to `overlap`
//! characters, so that pairs straddling a boundary stay visible to retrieval.
//!
//! Lengths are counted in `char`s. A piece that still exceeds `chunk_size` after every separator
//! has been tried is an atomic token: it is emitted whole under [`OversizedToken::KeepWhole`], or
//! cut at character boundaries under [`OversizedToken::Split`]. Chunking is a pure function of its
//! inputs.

use super::types::ChunkingError;

const DEFAULT_SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Treatment of tokens that are longer than the chunk size on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversizedToken {
    /// Emit the token as its own oversized chunk.
    #[default]
    KeepWhole,
    /// Cut the token into `chunk_size`-character pieces.
    Split,
}

/// Chunk size, overlap, and separator policy for [`chunk_text`].
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Maximum characters carried over from the previous chunk.
    pub overlap: usize,
    /// Separators in order of preference.
    pub separators: Vec<String>,
    /// Policy for single tokens longer than `chunk_size`.
    pub oversized: OversizedToken,
}

impl ChunkerConfig {
    /// Build a configuration with the default separator list.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|sep| sep.to_string()).collect(),
            oversized: OversizedToken::KeepWhole,
        })
    }

    /// Override the oversized-token policy.
    pub fn with_oversized(mut self, oversized: OversizedToken) -> Self {
        self.oversized = oversized;
        self
    }
}

/// Split every text in `texts`, preserving input order.
pub fn chunk_texts<S: AsRef<str>>(texts: &[S], config: &ChunkerConfig) -> Vec<String> {
    texts
        .iter()
        .flat_map(|text| chunk_text(text.as_ref(), config))
        .collect()
}

/// Split `text` into overlapping chunks bounded by `config.chunk_size` characters.
///
/// Returns an empty vector when the input is all whitespace.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    split_recursive(text, &config.separators, config)
}

fn split_recursive(text: &str, separators: &[String], config: &ChunkerConfig) -> Vec<String> {
    let Some(position) = separators.iter().position(|sep| text.contains(sep.as_str())) else {
        return atomic_pieces(text, config);
    };
    let separator = separators[position].as_str();
    let finer = &separators[position + 1..];

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in text.split(separator).filter(|piece| !piece.is_empty()) {
        if char_len(piece) <= config.chunk_size {
            pending.push(piece);
            continue;
        }
        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, separator, config));
            pending.clear();
        }
        chunks.extend(split_recursive(piece, finer, config));
    }
    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, separator, config));
    }

    chunks
}

/// Handle a piece that contains none of the remaining separators.
fn atomic_pieces(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if char_len(trimmed) <= config.chunk_size || config.oversized == OversizedToken::KeepWhole {
        return vec![trimmed.to_string()];
    }

    let chars: Vec<char> = trimmed.chars().collect();
    chars
        .chunks(config.chunk_size)
        .map(|window| window.iter().collect())
        .collect()
}

/// Greedily join pieces with `separator`, carrying up to `config.overlap` characters forward.
fn merge_pieces(pieces: &[&str], separator: &str, config: &ChunkerConfig) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: Vec<&str> = Vec::new();
    let mut window_len = 0usize;

    for &piece in pieces {
        let piece_len = char_len(piece);
        let joined_len = if window.is_empty() {
            piece_len
        } else {
            window_len + separator_len + piece_len
        };

        if joined_len > config.chunk_size && !window.is_empty() {
            push_chunk(&mut chunks, &window, separator);

            while !window.is_empty()
                && (window_len > config.overlap
                    || window_len + separator_len + piece_len > config.chunk_size)
            {
                let removed = window.remove(0);
                window_len -= char_len(removed);
                if !window.is_empty() {
                    window_len -= separator_len;
                }
            }
        }

        if !window.is_empty() {
            window_len += separator_len;
        }
        window.push(piece);
        window_len += piece_len;
    }

    if !window.is_empty() {
        push_chunk(&mut chunks, &window, separator);
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<String>, window: &[&str], separator: &str) {
    let joined = window.join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
