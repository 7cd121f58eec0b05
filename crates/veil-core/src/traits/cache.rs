use std::time::Duration;

use crate::errors::VeilResult;
use crate::models::{CacheStatus, Category, MappingEntry, ScopeId};

/// Fast, TTL-bound, non-authoritative lookup layer.
///
/// `Ok(None)` means "go to the durable store". Implementations must make `put`
/// idempotent: re-inserting an entry only refreshes its TTL.
pub trait ICacheTier: Send + Sync {
    /// Short backend label for logs.
    fn backend_name(&self) -> &'static str;

    /// Forward lookup by (scope, category, lookup key).
    fn get(
        &self,
        scope: &ScopeId,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<MappingEntry>>;

    /// Backward lookup by substitute.
    fn get_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<MappingEntry>>;

    /// Insert both directions with the given TTL.
    fn put(&self, entry: &MappingEntry, ttl: Duration) -> VeilResult<()>;

    /// Drop both directions of one entry.
    fn invalidate(&self, entry: &MappingEntry) -> VeilResult<()>;

    /// Drop every entry of a scope.
    fn invalidate_scope(&self, scope: &ScopeId) -> VeilResult<()>;

    /// Run pending expiry work. Backends with server-side TTL may do nothing.
    fn evict_expired(&self) -> VeilResult<()>;

    /// Current reachability.
    fn status(&self) -> CacheStatus;
}
