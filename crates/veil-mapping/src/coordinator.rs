//! MappingCoordinator: the forward and backward resolution state machines
//! and the write propagation policy between cache tier and durable store.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use veil_core::config::VeilConfig;
use veil_core::errors::{VeilError, VeilResult};
use veil_core::models::{CacheStatus, Category, InsertOutcome, MappingEntry, ScopeId, StoredMapping};
use veil_core::traits::{ICacheTier, IDurableStore};
use veil_crypto::{Encryptor, KeyHasher};
use veil_observability::tracing_setup::events;

use crate::allocator::{AllocationContext, Allocator};
use crate::inflight::InFlightRegistry;
use crate::persist_queue::{PersistJob, PersistQueue, PersistQueueStats};
use crate::stats::StatsTracker;
use crate::tiers::Tiers;

/// Everything the coordinator takes from configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub scope: ScopeId,
    /// Categories this scope accepts. Anything else is `CategoryNotSupported`.
    pub categories: Vec<Category>,
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub storage_timeout: Duration,
    /// TTL-on-durable. `None` keeps records until scope deletion.
    pub storage_ttl: Option<Duration>,
    pub async_storage_updates: bool,
    pub persist_queue_capacity: usize,
}

impl CoordinatorSettings {
    pub fn from_config(config: &VeilConfig) -> Self {
        Self {
            scope: config.scope(),
            categories: config.categories(),
            cache_ttl: config.cache_ttl(),
            cache_timeout: config.cache_timeout(),
            storage_timeout: config.storage_timeout(),
            storage_ttl: config.storage_ttl(),
            async_storage_updates: config.async_storage_updates,
            persist_queue_capacity: config.persist_queue_capacity,
        }
    }
}

pub struct MappingCoordinator {
    tiers: Arc<Tiers>,
    categories: Vec<Category>,
    storage_ttl: Option<Duration>,
    encryptor: Arc<Encryptor>,
    hasher: KeyHasher,
    allocator: Allocator,
    /// Serializes first allocation per (category, lookup key) within the process.
    key_locks: DashMap<(Category, String), Arc<Mutex<()>>>,
    persist: Option<PersistQueue>,
}

impl MappingCoordinator {
    /// Wire the tiers together. Async mode spawns the persist worker and so
    /// must be called inside a tokio runtime.
    pub fn new(
        settings: CoordinatorSettings,
        cache: Arc<dyn ICacheTier>,
        store: Arc<dyn IDurableStore>,
        encryptor: Arc<Encryptor>,
        hasher: KeyHasher,
        allocator: Allocator,
    ) -> VeilResult<Self> {
        let tiers = Arc::new(Tiers {
            scope: settings.scope,
            cache,
            store,
            inflight: InFlightRegistry::new(),
            cache_ttl: settings.cache_ttl,
            cache_timeout: settings.cache_timeout,
            storage_timeout: settings.storage_timeout,
        });
        let persist = if settings.async_storage_updates {
            Some(PersistQueue::start(
                Arc::clone(&tiers),
                settings.persist_queue_capacity,
            )?)
        } else {
            None
        };
        Ok(Self {
            tiers,
            categories: settings.categories,
            storage_ttl: settings.storage_ttl,
            encryptor,
            hasher,
            allocator,
            key_locks: DashMap::new(),
            persist,
        })
    }

    pub fn scope(&self) -> &ScopeId {
        &self.tiers.scope
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.tiers.cache.status()
    }

    pub fn is_async(&self) -> bool {
        self.persist.is_some()
    }

    pub fn persist_stats(&self) -> Option<PersistQueueStats> {
        self.persist.as_ref().map(PersistQueue::stats)
    }

    /// Mappings whose durable write is still pending.
    pub fn in_flight(&self) -> usize {
        self.tiers.inflight.len()
    }

    /// Original → substitute. Allocates and persists on a total miss.
    pub async fn resolve_forward(
        &self,
        original: &str,
        category: &Category,
        stats: &StatsTracker,
    ) -> VeilResult<String> {
        if !self.categories.contains(category) {
            return Err(VeilError::CategoryNotSupported {
                category: category.to_string(),
            });
        }
        let lookup_key = self.hasher.lookup_key(&self.tiers.scope, category, original);

        if let Some(substitute) = self.check_cache(category, &lookup_key, stats).await? {
            return Ok(substitute);
        }

        let key_lock = KeyLock::acquire(&self.key_locks, (category.clone(), lookup_key.clone()));
        let _guard = key_lock.mutex.lock().await;
        let substitute = self
            .resolve_forward_locked(original, category, &lookup_key, stats)
            .await?;
        Ok(substitute)
    }

    async fn resolve_forward_locked(
        &self,
        original: &str,
        category: &Category,
        lookup_key: &str,
        stats: &StatsTracker,
    ) -> VeilResult<String> {
        // Someone may have allocated while we waited for the lock.
        if let Some(substitute) = self.check_cache(category, lookup_key, stats).await? {
            return Ok(substitute);
        }

        // STORE_CHECK
        if let Some(record) = self.tiers.store_find(category, lookup_key).await? {
            let entry = self.open_record(record)?;
            stats.record_storage_hit();
            self.tiers.cache_put(&entry).await;
            return Ok(entry.substitute_value);
        }

        // ALLOCATE
        let ctx = ScopeContext {
            tiers: &self.tiers,
            category,
            original,
        };
        let substitute = self.allocator.allocate(category, &ctx).await?;
        let _reservation = Reservation {
            inflight: &self.tiers.inflight,
            scope: &self.tiers.scope,
            substitute: &substitute,
        };
        let entry = MappingEntry::new(
            self.tiers.scope.clone(),
            category.clone(),
            original,
            lookup_key,
            substitute.clone(),
        );

        // PERSIST
        let record = self.seal(&entry)?;
        let Some(queue) = &self.persist else {
            return self.write_through(&entry, &record, stats).await;
        };
        let Some(slot) = queue.reserve_slot().await else {
            tracing::warn!(scope = %entry.scope, "persist queue closed, writing inline");
            return self.write_through(&entry, &record, stats).await;
        };
        // Publish and send without an await in between: once the mapping is
        // visible its durable write belongs to the worker.
        self.tiers.inflight.publish(&entry);
        slot.send(PersistJob {
            entry: entry.clone(),
            record,
        });
        stats.record_generation();
        events::mapping_generated(
            entry.scope.as_str(),
            entry.category.as_str(),
            entry.substitute_value.len(),
        );
        Ok(entry.substitute_value)
    }

    /// Cache tier, then this process's pending writes.
    async fn check_cache(
        &self,
        category: &Category,
        lookup_key: &str,
        stats: &StatsTracker,
    ) -> VeilResult<Option<String>> {
        let hit = match self.tiers.cache_get(category, lookup_key).await? {
            Some(entry) => Some(entry),
            None => self
                .tiers
                .inflight
                .lookup_forward(&self.tiers.scope, category, lookup_key),
        };
        Ok(hit.map(|entry| {
            stats.record_cache_hit();
            entry.substitute_value
        }))
    }

    /// Synchronous PERSIST: durable first, then cache.
    async fn write_through(
        &self,
        entry: &MappingEntry,
        record: &StoredMapping,
        stats: &StatsTracker,
    ) -> VeilResult<String> {
        match self.tiers.store_insert_new(record).await {
            Ok(InsertOutcome::Inserted) => {
                stats.record_generation();
                events::mapping_generated(
                    entry.scope.as_str(),
                    entry.category.as_str(),
                    entry.substitute_value.len(),
                );
                self.tiers.cache_put(entry).await;
                Ok(entry.substitute_value.clone())
            }
            Ok(InsertOutcome::Existing(winner)) => {
                // Another process allocated first: adopt its substitute.
                tracing::debug!(scope = %entry.scope, category = %entry.category, "lost first-write race, adopting durable substitute");
                self.tiers.cache_invalidate(entry).await;
                let adopted = self.open_record(winner)?;
                stats.record_storage_hit();
                self.tiers.cache_put(&adopted).await;
                Ok(adopted.substitute_value)
            }
            Err(e) => {
                self.tiers.cache_invalidate(entry).await;
                Err(e)
            }
        }
    }

    /// Substitute → original. `None` when this scope never produced it.
    pub async fn resolve_backward(
        &self,
        substitute: &str,
        stats: &StatsTracker,
    ) -> VeilResult<Option<String>> {
        let cached = match self.tiers.cache_get_by_token(substitute).await? {
            Some(entry) => Some(entry),
            None => self.tiers.inflight.lookup_backward(&self.tiers.scope, substitute),
        };
        if let Some(entry) = cached {
            stats.record_cache_hit();
            return Ok(Some(entry.original_value));
        }

        match self.tiers.store_find_by_token(substitute).await? {
            Some(record) => {
                let entry = self.open_record(record)?;
                stats.record_storage_hit();
                self.tiers.cache_put(&entry).await;
                Ok(Some(entry.original_value))
            }
            None => Ok(None),
        }
    }

    /// Remove every mapping of the scope from the store and the cache tier.
    pub async fn delete_scope(&self) -> VeilResult<usize> {
        // Pending writes would otherwise land after the delete.
        self.flush().await;
        let removed = self.tiers.store_delete_scope().await?;
        if let Err(e) = self.tiers.cache_invalidate_scope().await {
            tracing::warn!(scope = %self.tiers.scope, error = %e, "cache scope invalidation failed; entries expire by TTL");
        }
        self.tiers.inflight.clear_scope(&self.tiers.scope);
        events::scope_deleted(self.tiers.scope.as_str(), removed);
        Ok(removed)
    }

    /// Maintenance pass: drop durable records past their TTL and run the
    /// cache tier's pending expiry work. Returns durable records removed.
    pub async fn purge_expired(&self) -> VeilResult<usize> {
        if let Err(e) = self.tiers.cache_evict_expired().await {
            tracing::debug!(scope = %self.tiers.scope, error = %e, "cache expiry pass failed");
        }
        self.tiers.store_purge_expired().await
    }

    /// Wait for queued durable writes. No-op in sync mode.
    pub async fn flush(&self) {
        if let Some(queue) = &self.persist {
            queue.flush().await;
        }
    }

    /// Drain queued writes and stop the worker.
    pub async fn shutdown(&self) {
        if let Some(queue) = &self.persist {
            queue.shutdown().await;
        }
    }

    fn seal(&self, entry: &MappingEntry) -> VeilResult<StoredMapping> {
        let (sealed_original, encrypted) = self.encryptor.encrypt(&entry.original_value)?;
        let expires_at = self
            .storage_ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| entry.created_at + ttl);
        Ok(StoredMapping {
            scope: entry.scope.clone(),
            category: entry.category.clone(),
            lookup_key: entry.lookup_key.clone(),
            substitute_value: entry.substitute_value.clone(),
            sealed_original,
            encrypted,
            created_at: entry.created_at,
            expires_at,
        })
    }

    fn open_record(&self, record: StoredMapping) -> VeilResult<MappingEntry> {
        let original = self
            .encryptor
            .decrypt(&record.sealed_original, record.encrypted)?;
        Ok(MappingEntry {
            scope: record.scope,
            category: record.category,
            original_value: original,
            lookup_key: record.lookup_key,
            substitute_value: record.substitute_value,
            created_at: record.created_at,
            expires_at: None,
        })
    }
}

/// Per-key allocation lock. The map entry goes away with the last holder.
struct KeyLock<'a> {
    locks: &'a DashMap<(Category, String), Arc<Mutex<()>>>,
    key: (Category, String),
    mutex: Arc<Mutex<()>>,
}

impl<'a> KeyLock<'a> {
    fn acquire(locks: &'a DashMap<(Category, String), Arc<Mutex<()>>>, key: (Category, String)) -> Self {
        let mutex = Arc::clone(&locks.entry(key.clone()).or_default());
        Self { locks, key, mutex }
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        // Two references: the map's and ours. More means someone else holds
        // or waits on the lock.
        self.locks
            .remove_if(&self.key, |_, held| Arc::strong_count(held) <= 2);
    }
}

/// Releases an allocated substitute's reservation unless it was published.
struct Reservation<'a> {
    inflight: &'a InFlightRegistry,
    scope: &'a ScopeId,
    substitute: &'a str,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.inflight.release_reservation(self.scope, self.substitute);
    }
}

/// Reverse-index view of the scope used during allocation.
struct ScopeContext<'a> {
    tiers: &'a Tiers,
    category: &'a Category,
    original: &'a str,
}

impl AllocationContext for ScopeContext<'_> {
    async fn is_taken(&self, candidate: &str) -> VeilResult<bool> {
        // A substitute equal to the original would not anonymize anything.
        if candidate == self.original {
            return Ok(true);
        }
        if self.tiers.inflight.is_reserved(&self.tiers.scope, candidate) {
            return Ok(true);
        }
        if self.tiers.cache_get_by_token(candidate).await?.is_some() {
            return Ok(true);
        }
        Ok(self.tiers.store_find_by_token(candidate).await?.is_some())
    }

    fn reserve(&self, candidate: &str) -> bool {
        self.tiers.inflight.reserve(&self.tiers.scope, candidate)
    }

    async fn next_sequence(&self) -> VeilResult<u64> {
        self.tiers.store_next_sequence(self.category).await
    }
}
