use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and translation activity.
#[derive(Default)]
pub struct PipelineMetrics {
    pairs_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
    turns: AtomicU64,
    rewrites: AtomicU64,
    rewrite_fallbacks: AtomicU64,
    failed_turns: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed ingestion run.
    pub fn record_ingestion(&self, pairs: u64, chunks: u64) {
        self.pairs_ingested.fetch_add(pairs, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunks, Ordering::Relaxed);
    }

    /// Record a chat turn and whether it ended in a visible error.
    pub fn record_turn(&self, failed: bool) {
        self.turns.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_turns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a query rewrite attempt and whether it fell back to the original input.
    pub fn record_rewrite(&self, fell_back: bool) {
        self.rewrites.fetch_add(1, Ordering::Relaxed);
        if fell_back {
            self.rewrite_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pairs_ingested: self.pairs_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            turns: self.turns.load(Ordering::Relaxed),
            rewrites: self.rewrites.load(Ordering::Relaxed),
            rewrite_fallbacks: self.rewrite_fallbacks.load(Ordering::Relaxed),
            failed_turns: self.failed_turns.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Translation pairs embedded since startup.
    pub pairs_ingested: u64,
    /// Chunks written to the index since startup.
    pub chunks_indexed: u64,
    /// Chat turns processed.
    pub turns: u64,
    /// Rewrite calls issued for source-language input.
    pub rewrites: u64,
    /// Rewrite calls that failed and fell back to the original query.
    pub rewrite_fallbacks: u64,
    /// Turns whose reply was an error message.
    pub failed_turns: u64,
}
