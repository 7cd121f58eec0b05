use chrono::{DateTime, Utc};

use crate::errors::VeilResult;
use crate::models::{Category, InsertOutcome, ScopeId, StoredMapping};

/// Authoritative, long-lived mapping persistence.
///
/// Keyed by scope + (category, lookup key) with a unique secondary index on
/// (scope, substitute). Lookups skip records whose durable TTL has passed.
pub trait IDurableStore: Send + Sync {
    /// Short backend label for logs.
    fn backend_name(&self) -> &'static str;

    fn find(
        &self,
        scope: &ScopeId,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<StoredMapping>>;

    fn find_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<StoredMapping>>;

    /// Upsert, last write wins for the same key. A substitute already owned by a
    /// different key in the scope is a `StorageError::Conflict`.
    fn save(&self, record: &StoredMapping) -> VeilResult<()>;

    /// Conditional first write: inserts only when no live record exists for the key.
    fn insert_new(&self, record: &StoredMapping) -> VeilResult<InsertOutcome>;

    /// Delete every record and sequence counter of a scope. Returns records removed.
    fn delete_scope(&self, scope: &ScopeId) -> VeilResult<usize>;

    /// Next value of the per-(scope, category) token counter, starting at 1.
    fn next_sequence(&self, scope: &ScopeId, category: &Category) -> VeilResult<u64>;

    /// Live records in a scope.
    fn count(&self, scope: &ScopeId) -> VeilResult<usize>;

    /// Remove records whose durable TTL has passed. Returns records removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> VeilResult<usize>;
}
