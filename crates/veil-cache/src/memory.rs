//! Process-local cache tier using moka.
//!
//! Two caches share one expiry policy: forward entries keyed by
//! (scope, category, lookup key) and a reverse index keyed by (scope, substitute).
//! TTL is per entry and fixed at insert time; reads do not extend it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

use veil_core::errors::VeilResult;
use veil_core::models::{CacheStatus, Category, MappingEntry, ScopeId};
use veil_core::traits::ICacheTier;

use crate::keys;

#[derive(Clone)]
struct TimedEntry {
    entry: Arc<MappingEntry>,
    ttl: Duration,
}

/// Expiry driven by the TTL stored in each value.
struct PerEntryTtl;

impl Expiry<String, TimedEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &TimedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    // Re-inserting refreshes the TTL.
    fn expire_after_update(
        &self,
        _key: &String,
        value: &TimedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache tier. Lost on restart; always `connected`.
pub struct MemoryCacheTier {
    forward: Cache<String, TimedEntry>,
    reverse: Cache<String, TimedEntry>,
}

impl MemoryCacheTier {
    /// Create a tier holding at most `max_entries` mappings per direction.
    pub fn new(max_entries: u64) -> Self {
        let build = || {
            Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build()
        };
        Self {
            forward: build(),
            reverse: build(),
        }
    }

    /// Forward entries currently held, after pending maintenance.
    pub fn len(&self) -> u64 {
        self.forward.run_pending_tasks();
        self.forward.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live(timed: TimedEntry) -> MappingEntry {
        (*timed.entry).clone()
    }
}

impl ICacheTier for MemoryCacheTier {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get(
        &self,
        scope: &ScopeId,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<MappingEntry>> {
        let key = keys::forward_key(scope, category, lookup_key);
        Ok(self.forward.get(&key).map(Self::live))
    }

    fn get_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<MappingEntry>> {
        let key = keys::token_key(scope, substitute);
        Ok(self.reverse.get(&key).map(Self::live))
    }

    fn put(&self, entry: &MappingEntry, ttl: Duration) -> VeilResult<()> {
        let timed = TimedEntry {
            entry: Arc::new(entry.with_ttl(ttl)),
            ttl,
        };
        self.forward.insert(
            keys::forward_key(&entry.scope, &entry.category, &entry.lookup_key),
            timed.clone(),
        );
        self.reverse
            .insert(keys::token_key(&entry.scope, &entry.substitute_value), timed);
        Ok(())
    }

    fn invalidate(&self, entry: &MappingEntry) -> VeilResult<()> {
        self.forward
            .invalidate(&keys::forward_key(&entry.scope, &entry.category, &entry.lookup_key));
        self.reverse
            .invalidate(&keys::token_key(&entry.scope, &entry.substitute_value));
        Ok(())
    }

    fn invalidate_scope(&self, scope: &ScopeId) -> VeilResult<()> {
        for cache in [&self.forward, &self.reverse] {
            let doomed: Vec<Arc<String>> = cache
                .iter()
                .filter(|(_, timed)| &timed.entry.scope == scope)
                .map(|(key, _)| key)
                .collect();
            for key in doomed {
                cache.invalidate(key.as_str());
            }
        }
        Ok(())
    }

    fn evict_expired(&self) -> VeilResult<()> {
        self.forward.run_pending_tasks();
        self.reverse.run_pending_tasks();
        Ok(())
    }

    fn status(&self) -> CacheStatus {
        CacheStatus::Connected
    }
}
