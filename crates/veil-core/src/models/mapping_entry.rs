use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, ScopeId};

/// One original↔substitute association, in memory and in the cache tier.
///
/// `original_value` is always plaintext here. `lookup_key` is what the tiers are
/// keyed by: the original itself, or its keyed hash in hashed-key mode.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub scope: ScopeId,
    pub category: Category,
    pub original_value: String,
    pub lookup_key: String,
    pub substitute_value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MappingEntry {
    pub fn new(
        scope: ScopeId,
        category: Category,
        original_value: impl Into<String>,
        lookup_key: impl Into<String>,
        substitute_value: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            category,
            original_value: original_value.into(),
            lookup_key: lookup_key.into(),
            substitute_value: substitute_value.into(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Copy with `expires_at` set `ttl` from now.
    pub fn with_ttl(&self, ttl: std::time::Duration) -> Self {
        let mut entry = self.clone();
        entry.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .map(|d| Utc::now() + d);
        entry
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

// Originals never reach logs through Debug.
impl fmt::Debug for MappingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingEntry")
            .field("scope", &self.scope)
            .field("category", &self.category)
            .field("original_value", &"<redacted>")
            .field("substitute_value", &self.substitute_value)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The durable form of a mapping. `sealed_original` is ciphertext when
/// `encrypted` is set, plaintext otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMapping {
    pub scope: ScopeId,
    pub category: Category,
    pub lookup_key: String,
    pub substitute_value: String,
    pub sealed_original: String,
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredMapping {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    /// True when both records describe the same (scope, category, lookup key).
    pub fn same_key(&self, other: &StoredMapping) -> bool {
        self.scope == other.scope
            && self.category == other.category
            && self.lookup_key == other.lookup_key
    }
}

/// Result of a conditional first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another writer got there first; this is the record it left.
    Existing(StoredMapping),
}
