//! SqliteDurableStore: owns the ConnectionPool and implements IDurableStore.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use veil_core::config::StorageConfig;
use veil_core::errors::VeilResult;
use veil_core::models::{Category, InsertOutcome, ScopeId, StoredMapping};
use veil_core::traits::IDurableStore;
use veil_observability::tracing_setup::events;

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::{mapping_ops, sequence_ops};

/// Document collection on SQLite. Each mapping scope is a namespace inside
/// one `mappings` table; both lookup directions hit an index.
pub struct SqliteDurableStore {
    pool: ConnectionPool,
    /// File-backed stores read through the pool; in-memory stores read
    /// through the writer since separate in-memory connections are
    /// separate databases.
    use_read_pool: bool,
}

impl SqliteDurableStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub fn open(path: &Path, config: &StorageConfig) -> VeilResult<Self> {
        let pool = ConnectionPool::open(path, config.read_pool_size, config.timeout_ms)?;
        let store = Self {
            pool,
            use_read_pool: true,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open using `config.db_path`.
    pub fn from_config(config: &StorageConfig) -> VeilResult<Self> {
        Self::open(Path::new(&config.db_path), config)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> VeilResult<Self> {
        let pool = ConnectionPool::open_in_memory(StorageConfig::default().timeout_ms)?;
        let store = Self {
            pool,
            use_read_pool: false,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> VeilResult<()> {
        self.pool.writer.with_conn(migrations::run_migrations)
    }

    /// Schema version currently applied.
    pub fn schema_version(&self) -> VeilResult<u32> {
        self.pool.writer.with_conn(migrations::current_version)
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn with_reader<F, T>(&self, f: F) -> VeilResult<T>
    where
        F: FnOnce(&Connection) -> VeilResult<T>,
    {
        if self.use_read_pool {
            self.pool.readers.with_conn(f)
        } else {
            self.pool.writer.with_conn(f)
        }
    }
}

impl IDurableStore for SqliteDurableStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn find(
        &self,
        scope: &ScopeId,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<StoredMapping>> {
        let now = Utc::now();
        self.with_reader(|conn| mapping_ops::find(conn, scope, category, lookup_key, now))
    }

    fn find_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<StoredMapping>> {
        let now = Utc::now();
        self.with_reader(|conn| mapping_ops::find_by_token(conn, scope, substitute, now))
    }

    fn save(&self, record: &StoredMapping) -> VeilResult<()> {
        self.pool
            .writer
            .with_conn(|conn| mapping_ops::save(conn, record, Utc::now()))
    }

    fn insert_new(&self, record: &StoredMapping) -> VeilResult<InsertOutcome> {
        self.pool
            .writer
            .with_conn(|conn| mapping_ops::insert_new(conn, record, Utc::now()))
    }

    fn delete_scope(&self, scope: &ScopeId) -> VeilResult<usize> {
        self.pool
            .writer
            .with_conn(|conn| mapping_ops::delete_scope(conn, scope))
    }

    fn next_sequence(&self, scope: &ScopeId, category: &Category) -> VeilResult<u64> {
        self.pool
            .writer
            .with_conn(|conn| sequence_ops::next_sequence(conn, scope, category))
    }

    fn count(&self, scope: &ScopeId) -> VeilResult<usize> {
        let now = Utc::now();
        self.with_reader(|conn| mapping_ops::count(conn, scope, now))
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> VeilResult<usize> {
        let removed = self
            .pool
            .writer
            .with_conn(|conn| mapping_ops::purge_expired(conn, now))?;
        events::expired_purged(self.backend_name(), removed);
        Ok(removed)
    }
}
