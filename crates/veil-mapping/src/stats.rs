//! Per-operation hit/miss counters.

use std::sync::atomic::{AtomicU64, Ordering};

use veil_core::models::StatsSnapshot;

/// Atomic counters shared by every lookup of one operation or batch.
///
/// Each anonymize call (or batch) owns its own tracker, so a snapshot never
/// picks up increments from a different batch.
#[derive(Debug, Default)]
pub struct StatsTracker {
    cache_hits: AtomicU64,
    storage_hits: AtomicU64,
    new_generations: AtomicU64,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_hit(&self) {
        self.storage_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation(&self) {
        self.new_generations.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters as of now.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            storage_hits: self.storage_hits.load(Ordering::Relaxed),
            new_generations: self.new_generations.load(Ordering::Relaxed),
        }
    }
}
