use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Immutable hit/miss counters for one operation or batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub storage_hits: u64,
    pub new_generations: u64,
}

impl StatsSnapshot {
    pub fn total_lookups(&self) -> u64 {
        self.cache_hits + self.storage_hits + self.new_generations
    }
}

impl Add for StatsSnapshot {
    type Output = StatsSnapshot;

    fn add(self, rhs: StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits + rhs.cache_hits,
            storage_hits: self.storage_hits + rhs.storage_hits,
            new_generations: self.new_generations + rhs.new_generations,
        }
    }
}

/// Reachability of the cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Connected,
    /// Recent failures, still serving.
    Degraded,
    Unavailable,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}
