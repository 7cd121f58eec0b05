//! In-process durable store. Same contract as the SQLite backend, no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use veil_core::errors::{StorageError, VeilResult};
use veil_core::models::{Category, InsertOutcome, ScopeId, StoredMapping};
use veil_core::traits::IDurableStore;
use veil_observability::tracing_setup::events;

type RecordKey = (ScopeId, Category, String);
type TokenKey = (ScopeId, String);

#[derive(Default)]
struct Inner {
    records: HashMap<RecordKey, StoredMapping>,
    by_token: HashMap<TokenKey, RecordKey>,
    sequences: HashMap<(ScopeId, Category), u64>,
}

impl Inner {
    fn live(&self, key: &RecordKey, now: DateTime<Utc>) -> Option<&StoredMapping> {
        self.records.get(key).filter(|r| !r.is_expired(now))
    }

    fn remove(&mut self, key: &RecordKey) -> Option<StoredMapping> {
        let removed = self.records.remove(key)?;
        self.by_token
            .remove(&(removed.scope.clone(), removed.substitute_value.clone()));
        Some(removed)
    }

    /// Drop expired records that would block `record`.
    fn clear_expired_blockers(&mut self, record: &StoredMapping, now: DateTime<Utc>) {
        let key = record_key(record);
        if self.records.get(&key).is_some_and(|r| r.is_expired(now)) {
            self.remove(&key);
        }
        let token = (record.scope.clone(), record.substitute_value.clone());
        if let Some(owner) = self.by_token.get(&token).cloned() {
            if self.records.get(&owner).is_some_and(|r| r.is_expired(now)) {
                self.remove(&owner);
            }
        }
    }

    fn check_substitute_free(&self, record: &StoredMapping) -> VeilResult<()> {
        let token = (record.scope.clone(), record.substitute_value.clone());
        match self.by_token.get(&token) {
            Some(owner) if *owner != record_key(record) => Err(StorageError::Conflict {
                details: format!(
                    "substitute already owned in scope {} by another {} value",
                    record.scope, owner.1
                ),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn write(&mut self, record: &StoredMapping) {
        let key = record_key(record);
        if let Some(previous) = self.records.get(&key) {
            if previous.substitute_value != record.substitute_value {
                self.by_token
                    .remove(&(previous.scope.clone(), previous.substitute_value.clone()));
            }
        }
        self.by_token.insert(
            (record.scope.clone(), record.substitute_value.clone()),
            key.clone(),
        );
        self.records.insert(key, record.clone());
    }
}

fn record_key(record: &StoredMapping) -> RecordKey {
    (
        record.scope.clone(),
        record.category.clone(),
        record.lookup_key.clone(),
    )
}

/// Durable store held in process memory behind a `RwLock`.
#[derive(Default)]
pub struct MemoryDurableStore {
    inner: RwLock<Inner>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> VeilResult<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| {
            StorageError::Unavailable {
                reason: "memory store lock poisoned".into(),
            }
            .into()
        })
    }

    fn write(&self) -> VeilResult<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| {
            StorageError::Unavailable {
                reason: "memory store lock poisoned".into(),
            }
            .into()
        })
    }
}

impl IDurableStore for MemoryDurableStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn find(
        &self,
        scope: &ScopeId,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<StoredMapping>> {
        let key = (scope.clone(), category.clone(), lookup_key.to_string());
        Ok(self.read()?.live(&key, Utc::now()).cloned())
    }

    fn find_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<StoredMapping>> {
        let inner = self.read()?;
        let Some(key) = inner.by_token.get(&(scope.clone(), substitute.to_string())) else {
            return Ok(None);
        };
        Ok(inner.live(key, Utc::now()).cloned())
    }

    fn save(&self, record: &StoredMapping) -> VeilResult<()> {
        let mut inner = self.write()?;
        inner.clear_expired_blockers(record, Utc::now());
        inner.check_substitute_free(record)?;
        inner.write(record);
        Ok(())
    }

    fn insert_new(&self, record: &StoredMapping) -> VeilResult<InsertOutcome> {
        let now = Utc::now();
        let mut inner = self.write()?;
        inner.clear_expired_blockers(record, now);
        if let Some(existing) = inner.live(&record_key(record), now) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        inner.check_substitute_free(record)?;
        inner.write(record);
        Ok(InsertOutcome::Inserted)
    }

    fn delete_scope(&self, scope: &ScopeId) -> VeilResult<usize> {
        let mut inner = self.write()?;
        let doomed: Vec<RecordKey> = inner
            .records
            .keys()
            .filter(|(s, _, _)| s == scope)
            .cloned()
            .collect();
        for key in &doomed {
            inner.remove(key);
        }
        inner.sequences.retain(|(s, _), _| s != scope);
        Ok(doomed.len())
    }

    fn next_sequence(&self, scope: &ScopeId, category: &Category) -> VeilResult<u64> {
        let mut inner = self.write()?;
        let counter = inner
            .sequences
            .entry((scope.clone(), category.clone()))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn count(&self, scope: &ScopeId) -> VeilResult<usize> {
        let now = Utc::now();
        Ok(self
            .read()?
            .records
            .values()
            .filter(|r| &r.scope == scope && !r.is_expired(now))
            .count())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> VeilResult<usize> {
        let mut inner = self.write()?;
        let doomed: Vec<RecordKey> = inner
            .records
            .iter()
            .filter(|(_, r)| r.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            inner.remove(key);
        }
        events::expired_purged(self.backend_name(), doomed.len());
        Ok(doomed.len())
    }
}
