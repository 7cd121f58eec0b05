//! Outward result types.

use serde::{Deserialize, Serialize};

use veil_core::errors::VeilError;
use veil_core::models::{CacheStatus, StatsSnapshot};

/// Counters for one call or one batch, plus cache backend reachability as
/// observed when the call finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizationStats {
    pub cache_hits: u64,
    pub storage_hits: u64,
    pub new_generations: u64,
    pub cache_status: CacheStatus,
}

impl AnonymizationStats {
    pub(crate) fn new(snapshot: StatsSnapshot, cache_status: CacheStatus) -> Self {
        Self {
            cache_hits: snapshot.cache_hits,
            storage_hits: snapshot.storage_hits,
            new_generations: snapshot.new_generations,
            cache_status,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits,
            storage_hits: self.storage_hits,
            new_generations: self.new_generations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizationResult {
    pub anonymized_text: String,
    pub stats: AnonymizationStats,
    /// `Degraded` when tolerant mode passed spans through unchanged.
    pub status: ItemStatus,
}

/// A failure that tolerant mode absorbed by leaving a span unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanError {
    /// Category of the span, or `None` when classification itself failed.
    pub category: Option<String>,
    pub kind: String,
    pub message: String,
}

impl SpanError {
    pub(crate) fn new(category: Option<&str>, err: &VeilError) -> Self {
        Self {
            category: category.map(str::to_string),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Complete,
    /// Some spans were passed through unchanged.
    Degraded {
        passed_through: usize,
        errors: Vec<SpanError>,
    },
}

impl ItemStatus {
    pub(crate) fn from_errors(errors: Vec<SpanError>) -> Self {
        if errors.is_empty() {
            Self::Complete
        } else {
            Self::Degraded {
                passed_through: errors.len(),
                errors,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub text: String,
    pub status: ItemStatus,
}

/// Items in input order, with one stats snapshot for the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
    pub stats: AnonymizationStats,
}

impl BatchResult {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.text.as_str())
    }

    pub fn degraded(&self) -> usize {
        self.items.iter().filter(|item| !item.status.is_complete()).count()
    }
}
