use serde::{Deserialize, Serialize};

use super::defaults;

/// Which Durable Store backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageType {
    /// In-process maps. Survives nothing; useful for tests and one-shot runs.
    #[default]
    Memory,
    /// SQLite-backed document collection, one namespace per mapping scope.
    DocumentCollection,
}

/// Durable store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file (document-collection backend).
    pub db_path: String,
    /// Optional TTL-on-durable in seconds. `None` keeps entries until scope deletion.
    pub ttl: Option<u64>,
    /// Bound on every store call.
    pub timeout_ms: u64,
    /// Number of read connections in the pool.
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_DB_FILENAME.to_string(),
            ttl: None,
            timeout_ms: defaults::DEFAULT_STORAGE_TIMEOUT_MS,
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
        }
    }
}
