//! Fault-injecting wrappers around real tiers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use veil_core::errors::{CacheError, StorageError, VeilError, VeilResult};
use veil_core::models::{CacheStatus, Category, InsertOutcome, MappingEntry, ScopeId, StoredMapping};
use veil_core::traits::{ICacheTier, IDurableStore};

/// Store whose reads and writes can be switched to fail independently.
pub struct FaultyStore {
    inner: Arc<dyn IDurableStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_attempts: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn IDurableStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            write_attempts: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Calls to `save` and `insert_new`, failed or not.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn read_guard(&self) -> VeilResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "injected read failure".into(),
            }
            .into());
        }
        Ok(())
    }

    fn write_guard(&self) -> VeilResult<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "injected write failure".into(),
            }
            .into());
        }
        Ok(())
    }
}

impl IDurableStore for FaultyStore {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    fn find(&self, scope: &ScopeId, category: &Category, lookup_key: &str) -> VeilResult<Option<StoredMapping>> {
        self.read_guard()?;
        self.inner.find(scope, category, lookup_key)
    }

    fn find_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<StoredMapping>> {
        self.read_guard()?;
        self.inner.find_by_token(scope, substitute)
    }

    fn save(&self, record: &StoredMapping) -> VeilResult<()> {
        self.write_guard()?;
        self.inner.save(record)
    }

    fn insert_new(&self, record: &StoredMapping) -> VeilResult<InsertOutcome> {
        self.write_guard()?;
        self.inner.insert_new(record)
    }

    fn delete_scope(&self, scope: &ScopeId) -> VeilResult<usize> {
        self.write_guard()?;
        self.inner.delete_scope(scope)
    }

    fn next_sequence(&self, scope: &ScopeId, category: &Category) -> VeilResult<u64> {
        self.write_guard()?;
        self.inner.next_sequence(scope, category)
    }

    fn count(&self, scope: &ScopeId) -> VeilResult<usize> {
        self.read_guard()?;
        self.inner.count(scope)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> VeilResult<usize> {
        self.write_guard()?;
        self.inner.purge_expired(now)
    }
}

/// Store that sleeps before every call, or only before writes.
pub struct SlowStore {
    inner: Arc<dyn IDurableStore>,
    delay: Duration,
    slow_reads: bool,
}

impl SlowStore {
    pub fn new(inner: Arc<dyn IDurableStore>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            slow_reads: true,
        }
    }

    /// Reads go straight through; writes sleep.
    pub fn slow_writes(inner: Arc<dyn IDurableStore>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            slow_reads: false,
        }
    }

    fn pause(&self) {
        std::thread::sleep(self.delay);
    }

    fn pause_read(&self) {
        if self.slow_reads {
            self.pause();
        }
    }
}

impl IDurableStore for SlowStore {
    fn backend_name(&self) -> &'static str {
        "slow"
    }

    fn find(&self, scope: &ScopeId, category: &Category, lookup_key: &str) -> VeilResult<Option<StoredMapping>> {
        self.pause_read();
        self.inner.find(scope, category, lookup_key)
    }

    fn find_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<StoredMapping>> {
        self.pause_read();
        self.inner.find_by_token(scope, substitute)
    }

    fn save(&self, record: &StoredMapping) -> VeilResult<()> {
        self.pause();
        self.inner.save(record)
    }

    fn insert_new(&self, record: &StoredMapping) -> VeilResult<InsertOutcome> {
        self.pause();
        self.inner.insert_new(record)
    }

    fn delete_scope(&self, scope: &ScopeId) -> VeilResult<usize> {
        self.pause();
        self.inner.delete_scope(scope)
    }

    fn next_sequence(&self, scope: &ScopeId, category: &Category) -> VeilResult<u64> {
        self.pause();
        self.inner.next_sequence(scope, category)
    }

    fn count(&self, scope: &ScopeId) -> VeilResult<usize> {
        self.pause_read();
        self.inner.count(scope)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> VeilResult<usize> {
        self.pause();
        self.inner.purge_expired(now)
    }
}

/// Cache tier that can be made unreachable, or made to hand back payloads
/// that fail to decrypt.
pub struct FaultyCache {
    inner: Arc<dyn ICacheTier>,
    unavailable: AtomicBool,
    corrupt: AtomicBool,
}

impl FaultyCache {
    pub fn new(inner: Arc<dyn ICacheTier>) -> Self {
        Self {
            inner,
            unavailable: AtomicBool::new(false),
            corrupt: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Reads that hit return a decryption error.
    pub fn set_corrupt(&self, corrupt: bool) {
        self.corrupt.store(corrupt, Ordering::SeqCst);
    }

    fn guard(&self) -> VeilResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "injected outage".into(),
            }
            .into());
        }
        Ok(())
    }

    fn check_read(&self, hit: Option<MappingEntry>) -> VeilResult<Option<MappingEntry>> {
        if hit.is_some() && self.corrupt.load(Ordering::SeqCst) {
            return Err(VeilError::DecryptionError {
                reason: "authentication tag mismatch".into(),
            });
        }
        Ok(hit)
    }
}

impl ICacheTier for FaultyCache {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    fn get(&self, scope: &ScopeId, category: &Category, lookup_key: &str) -> VeilResult<Option<MappingEntry>> {
        self.guard()?;
        let hit = self.inner.get(scope, category, lookup_key)?;
        self.check_read(hit)
    }

    fn get_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<MappingEntry>> {
        self.guard()?;
        let hit = self.inner.get_by_token(scope, substitute)?;
        self.check_read(hit)
    }

    fn put(&self, entry: &MappingEntry, ttl: Duration) -> VeilResult<()> {
        self.guard()?;
        self.inner.put(entry, ttl)
    }

    fn invalidate(&self, entry: &MappingEntry) -> VeilResult<()> {
        self.guard()?;
        self.inner.invalidate(entry)
    }

    fn invalidate_scope(&self, scope: &ScopeId) -> VeilResult<()> {
        self.guard()?;
        self.inner.invalidate_scope(scope)
    }

    fn evict_expired(&self) -> VeilResult<()> {
        self.guard()?;
        self.inner.evict_expired()
    }

    fn status(&self) -> CacheStatus {
        if self.unavailable.load(Ordering::SeqCst) {
            CacheStatus::Unavailable
        } else {
            self.inner.status()
        }
    }
}

/// Cache tier whose writes sleep. Reads go straight through.
pub struct SlowCache {
    inner: Arc<dyn ICacheTier>,
    put_delay: Duration,
}

impl SlowCache {
    pub fn new(inner: Arc<dyn ICacheTier>, put_delay: Duration) -> Self {
        Self { inner, put_delay }
    }
}

impl ICacheTier for SlowCache {
    fn backend_name(&self) -> &'static str {
        "slow"
    }

    fn get(&self, scope: &ScopeId, category: &Category, lookup_key: &str) -> VeilResult<Option<MappingEntry>> {
        self.inner.get(scope, category, lookup_key)
    }

    fn get_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<MappingEntry>> {
        self.inner.get_by_token(scope, substitute)
    }

    fn put(&self, entry: &MappingEntry, ttl: Duration) -> VeilResult<()> {
        std::thread::sleep(self.put_delay);
        self.inner.put(entry, ttl)
    }

    fn invalidate(&self, entry: &MappingEntry) -> VeilResult<()> {
        self.inner.invalidate(entry)
    }

    fn invalidate_scope(&self, scope: &ScopeId) -> VeilResult<()> {
        self.inner.invalidate_scope(scope)
    }

    fn evict_expired(&self) -> VeilResult<()> {
        self.inner.evict_expired()
    }

    fn status(&self) -> CacheStatus {
        self.inner.status()
    }
}
