//! Bounded access to the cache tier and durable store.
//!
//! Backend calls are synchronous and may block on I/O, so each one runs on the
//! blocking pool under a timeout. An elapsed cache call is reported as
//! `CacheError::Timeout`, an elapsed store call as `StorageError::Timeout`.

use std::sync::Arc;
use std::time::Duration;

use veil_core::errors::{CacheError, StorageError, VeilError, VeilResult};
use veil_core::models::{Category, InsertOutcome, MappingEntry, ScopeId, StoredMapping};
use veil_core::traits::{ICacheTier, IDurableStore};

use crate::inflight::InFlightRegistry;

pub(crate) struct Tiers {
    pub scope: ScopeId,
    pub cache: Arc<dyn ICacheTier>,
    pub store: Arc<dyn IDurableStore>,
    pub inflight: InFlightRegistry,
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub storage_timeout: Duration,
}

impl Tiers {
    async fn call_cache<T, F>(&self, op: &'static str, f: F) -> VeilResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ICacheTier) -> VeilResult<T> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let task = tokio::task::spawn_blocking(move || f(cache.as_ref()));
        match tokio::time::timeout(self.cache_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(CacheError::Backend {
                message: format!("{op} task failed: {join}"),
            }
            .into()),
            Err(_) => Err(CacheError::Timeout {
                operation: op.to_string(),
                millis: self.cache_timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    async fn call_store<T, F>(&self, op: &'static str, f: F) -> VeilResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn IDurableStore) -> VeilResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || f(store.as_ref()));
        match tokio::time::timeout(self.storage_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(StorageError::Unavailable {
                reason: format!("{op} task failed: {join}"),
            }
            .into()),
            Err(_) => Err(StorageError::Timeout {
                operation: op.to_string(),
                millis: self.storage_timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    /// Cache read where any failure except a decryption error is a miss.
    fn cache_miss_on_error(
        &self,
        op: &str,
        result: VeilResult<Option<MappingEntry>>,
    ) -> VeilResult<Option<MappingEntry>> {
        match result {
            Ok(hit) => Ok(hit),
            Err(e @ VeilError::DecryptionError { .. }) => Err(e),
            Err(e) => {
                tracing::debug!(
                    scope = %self.scope,
                    tier = self.cache.backend_name(),
                    op,
                    error = %e,
                    "cache call failed, treating as miss"
                );
                Ok(None)
            }
        }
    }

    pub async fn cache_get(
        &self,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<MappingEntry>> {
        let (scope, category, key) = (self.scope.clone(), category.clone(), lookup_key.to_string());
        let result = self
            .call_cache("cache_get", move |c| c.get(&scope, &category, &key))
            .await;
        self.cache_miss_on_error("cache_get", result)
    }

    pub async fn cache_get_by_token(&self, substitute: &str) -> VeilResult<Option<MappingEntry>> {
        let (scope, substitute) = (self.scope.clone(), substitute.to_string());
        let result = self
            .call_cache("cache_get_by_token", move |c| c.get_by_token(&scope, &substitute))
            .await;
        self.cache_miss_on_error("cache_get_by_token", result)
    }

    /// Best-effort cache write. Failures are logged, never returned.
    pub async fn cache_put(&self, entry: &MappingEntry) {
        let (entry, ttl) = (entry.clone(), self.cache_ttl);
        if let Err(e) = self.call_cache("cache_put", move |c| c.put(&entry, ttl)).await {
            tracing::debug!(scope = %self.scope, tier = self.cache.backend_name(), error = %e, "cache put failed");
        }
    }

    pub async fn cache_invalidate(&self, entry: &MappingEntry) {
        let entry = entry.clone();
        if let Err(e) = self.call_cache("cache_invalidate", move |c| c.invalidate(&entry)).await {
            tracing::debug!(scope = %self.scope, error = %e, "cache invalidate failed");
        }
    }

    pub async fn cache_invalidate_scope(&self) -> VeilResult<()> {
        let scope = self.scope.clone();
        self.call_cache("cache_invalidate_scope", move |c| c.invalidate_scope(&scope))
            .await
    }

    pub async fn store_find(
        &self,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<StoredMapping>> {
        let (scope, category, key) = (self.scope.clone(), category.clone(), lookup_key.to_string());
        self.call_store("find", move |s| s.find(&scope, &category, &key))
            .await
    }

    pub async fn store_find_by_token(&self, substitute: &str) -> VeilResult<Option<StoredMapping>> {
        let (scope, substitute) = (self.scope.clone(), substitute.to_string());
        self.call_store("find_by_token", move |s| s.find_by_token(&scope, &substitute))
            .await
    }

    pub async fn store_insert_new(&self, record: &StoredMapping) -> VeilResult<InsertOutcome> {
        let record = record.clone();
        self.call_store("insert_new", move |s| s.insert_new(&record))
            .await
    }

    pub async fn store_next_sequence(&self, category: &Category) -> VeilResult<u64> {
        let (scope, category) = (self.scope.clone(), category.clone());
        self.call_store("next_sequence", move |s| s.next_sequence(&scope, &category))
            .await
    }

    pub async fn cache_evict_expired(&self) -> VeilResult<()> {
        self.call_cache("cache_evict_expired", |c| c.evict_expired())
            .await
    }

    pub async fn store_purge_expired(&self) -> VeilResult<usize> {
        let now = chrono::Utc::now();
        self.call_store("purge_expired", move |s| s.purge_expired(now))
            .await
    }

    pub async fn store_delete_scope(&self) -> VeilResult<usize> {
        let scope = self.scope.clone();
        self.call_store("delete_scope", move |s| s.delete_scope(&scope))
            .await
    }
}
