pub mod cache_config;
pub mod defaults;
pub mod generator_config;
pub mod storage_config;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use cache_config::{CacheConfig, CacheType};
pub use generator_config::GeneratorConfig;
pub use storage_config::{StorageConfig, StorageType};

use crate::constants::{MAX_ALLOCATION_ATTEMPTS, MAX_BATCH_CONCURRENCY};
use crate::errors::{VeilError, VeilResult};
use crate::models::{Category, ScopeId};

/// How per-span failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymizerMode {
    /// Any recoverable failure aborts the whole call.
    #[default]
    Strict,
    /// Recoverable failures are logged and the span passes through unchanged.
    Tolerant,
}

impl std::str::FromStr for AnonymizerMode {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "tolerant" => Ok(Self::Tolerant),
            other => Err(VeilError::config(format!(
                "unknown mode '{other}', expected 'strict' or 'tolerant'"
            ))),
        }
    }
}

/// Secret used to derive the encryption and lookup-hash keys.
/// Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Top-level configuration. Built once at startup, then passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    /// Mapping scope identifier.
    pub collection_name: String,
    /// Categories the classifier reports and the allocator accepts.
    pub info_types: Vec<String>,
    pub mode: AnonymizerMode,
    /// Realistic generator policy when true, `<CATEGORY_n>` tokens when false.
    pub use_realistic_fake_data: bool,
    pub encryption_key: Option<EncryptionKey>,
    /// Key the durable store by a keyed hash of the original. Implied by `encryption_key`.
    pub hash_lookup_keys: bool,
    pub cache_type: CacheType,
    pub cache_config: CacheConfig,
    /// Soft cap on entries held by the memory cache tier.
    pub cache_size: u64,
    pub storage_type: StorageType,
    pub storage_config: StorageConfig,
    pub async_storage_updates: bool,
    pub persist_queue_capacity: usize,
    pub batch_concurrency: usize,
    pub max_allocation_attempts: u32,
    pub generator: GeneratorConfig,
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            collection_name: defaults::DEFAULT_COLLECTION_NAME.to_string(),
            info_types: defaults::DEFAULT_INFO_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mode: AnonymizerMode::default(),
            use_realistic_fake_data: defaults::DEFAULT_USE_REALISTIC_FAKE_DATA,
            encryption_key: None,
            hash_lookup_keys: defaults::DEFAULT_HASH_LOOKUP_KEYS,
            cache_type: CacheType::default(),
            cache_config: CacheConfig::default(),
            cache_size: defaults::DEFAULT_CACHE_SIZE,
            storage_type: StorageType::default(),
            storage_config: StorageConfig::default(),
            async_storage_updates: defaults::DEFAULT_ASYNC_STORAGE_UPDATES,
            persist_queue_capacity: defaults::DEFAULT_PERSIST_QUEUE_CAPACITY,
            batch_concurrency: defaults::DEFAULT_BATCH_CONCURRENCY,
            max_allocation_attempts: defaults::DEFAULT_MAX_ALLOCATION_ATTEMPTS,
            generator: GeneratorConfig::default(),
        }
    }
}

impl VeilConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(source: &str) -> VeilResult<Self> {
        toml::from_str(source).map_err(|e| VeilError::config(format!("invalid TOML: {e}")))
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> VeilResult<String> {
        toml::to_string(self).map_err(|e| VeilError::config(format!("serialize TOML: {e}")))
    }

    /// Build from `VEIL_*` process environment variables on top of the defaults.
    pub fn from_env() -> VeilResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> VeilResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("VEIL_COLLECTION") {
            config.collection_name = v;
        }
        if let Some(v) = lookup("VEIL_INFO_TYPES") {
            config.info_types = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("VEIL_MODE") {
            config.mode = v.parse()?;
        }
        if let Some(v) = lookup("VEIL_USE_REALISTIC_FAKE_DATA") {
            config.use_realistic_fake_data = parse_bool("VEIL_USE_REALISTIC_FAKE_DATA", &v)?;
        }
        if let Some(v) = lookup("VEIL_ENCRYPTION_KEY") {
            config.encryption_key = Some(EncryptionKey::new(v));
        }
        if let Some(v) = lookup("VEIL_HASH_LOOKUP_KEYS") {
            config.hash_lookup_keys = parse_bool("VEIL_HASH_LOOKUP_KEYS", &v)?;
        }
        if let Some(v) = lookup("VEIL_CACHE_TYPE") {
            config.cache_type = match v.trim() {
                "memory" => CacheType::Memory,
                "networked-cache" => CacheType::NetworkedCache,
                other => {
                    return Err(VeilError::config(format!(
                        "unknown cache type '{other}', expected 'memory' or 'networked-cache'"
                    )))
                }
            };
        }
        if let Some(v) = lookup("VEIL_CACHE_TTL") {
            config.cache_config.ttl = parse_num("VEIL_CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("VEIL_CACHE_HOST") {
            config.cache_config.host = Some(v);
        }
        if let Some(v) = lookup("VEIL_CACHE_PORT") {
            config.cache_config.port = parse_num("VEIL_CACHE_PORT", &v)?;
        }
        if let Some(v) = lookup("VEIL_CACHE_INSTANCE_ID") {
            config.cache_config.instance_id = Some(v);
        }
        if let Some(v) = lookup("VEIL_CACHE_REGION") {
            config.cache_config.region = Some(v);
        }
        if let Some(v) = lookup("VEIL_CACHE_SIZE") {
            config.cache_size = parse_num("VEIL_CACHE_SIZE", &v)?;
        }
        if let Some(v) = lookup("VEIL_STORAGE_TYPE") {
            config.storage_type = match v.trim() {
                "memory" => StorageType::Memory,
                "document-collection" => StorageType::DocumentCollection,
                other => {
                    return Err(VeilError::config(format!(
                        "unknown storage type '{other}', expected 'memory' or 'document-collection'"
                    )))
                }
            };
        }
        if let Some(v) = lookup("VEIL_DB_PATH") {
            config.storage_config.db_path = v;
        }
        if let Some(v) = lookup("VEIL_STORAGE_TTL") {
            config.storage_config.ttl = Some(parse_num("VEIL_STORAGE_TTL", &v)?);
        }
        if let Some(v) = lookup("VEIL_ASYNC_STORAGE_UPDATES") {
            config.async_storage_updates = parse_bool("VEIL_ASYNC_STORAGE_UPDATES", &v)?;
        }
        if let Some(v) = lookup("VEIL_BATCH_CONCURRENCY") {
            config.batch_concurrency = parse_num("VEIL_BATCH_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("VEIL_FAKER_LOCALE") {
            config.generator.locale = Some(v);
        }
        if let Some(v) = lookup("VEIL_FAKER_SEED") {
            config.generator.seed = Some(parse_num("VEIL_FAKER_SEED", &v)?);
        }

        Ok(config)
    }

    /// Reject settings the mapping contract cannot work with.
    pub fn validate(&self) -> VeilResult<()> {
        if self.collection_name.trim().is_empty() {
            return Err(VeilError::config("collection_name must not be empty"));
        }
        if self.info_types.iter().all(|t| t.trim().is_empty()) {
            return Err(VeilError::config("info_types must name at least one category"));
        }
        if self.cache_config.ttl == 0 {
            return Err(VeilError::config("cache_config.ttl must be greater than zero"));
        }
        if self.cache_size == 0 {
            return Err(VeilError::config("cache_size must be greater than zero"));
        }
        if self.cache_config.timeout_ms == 0 || self.storage_config.timeout_ms == 0 {
            return Err(VeilError::config("backend timeouts must be greater than zero"));
        }
        if self.storage_config.ttl == Some(0) {
            return Err(VeilError::config("storage_config.ttl must be greater than zero when set"));
        }
        if self.batch_concurrency == 0 || self.batch_concurrency > MAX_BATCH_CONCURRENCY {
            return Err(VeilError::config(format!(
                "batch_concurrency must be within 1..={MAX_BATCH_CONCURRENCY}"
            )));
        }
        if self.persist_queue_capacity == 0 {
            return Err(VeilError::config("persist_queue_capacity must be greater than zero"));
        }
        if self.max_allocation_attempts == 0 || self.max_allocation_attempts > MAX_ALLOCATION_ATTEMPTS
        {
            return Err(VeilError::config(format!(
                "max_allocation_attempts must be within 1..={MAX_ALLOCATION_ATTEMPTS}"
            )));
        }
        if self.cache_type == CacheType::NetworkedCache {
            let has_host = self.cache_config.host.as_deref().is_some_and(|h| !h.is_empty());
            let has_instance = self.cache_config.instance_id.is_some() && self.cache_config.region.is_some();
            if !has_host && !has_instance {
                return Err(VeilError::config(
                    "networked-cache requires cache_config.host or cache_config.instance_id + region",
                ));
            }
        }
        if self.storage_type == StorageType::DocumentCollection
            && self.storage_config.db_path.trim().is_empty()
        {
            return Err(VeilError::config("document-collection requires storage_config.db_path"));
        }
        if let Some(key) = &self.encryption_key {
            if key.expose().is_empty() {
                return Err(VeilError::config("encryption_key must not be empty when set"));
            }
        }
        Ok(())
    }

    /// The mapping scope this configuration addresses.
    pub fn scope(&self) -> ScopeId {
        ScopeId::new(self.collection_name.trim())
    }

    /// Configured info types as normalized categories, duplicates removed.
    pub fn categories(&self) -> Vec<Category> {
        let mut out: Vec<Category> = Vec::with_capacity(self.info_types.len());
        for raw in &self.info_types {
            if raw.trim().is_empty() {
                continue;
            }
            let category = Category::new(raw);
            if !out.contains(&category) {
                out.push(category);
            }
        }
        out
    }

    /// Hashed-key mode is on when asked for, and always when values are encrypted.
    pub fn effective_hash_lookup_keys(&self) -> bool {
        self.hash_lookup_keys || self.encryption_key.is_some()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_config.ttl)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_config.timeout_ms)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_config.timeout_ms)
    }

    pub fn storage_ttl(&self) -> Option<Duration> {
        self.storage_config.ttl.map(Duration::from_secs)
    }
}

fn parse_bool(name: &str, value: &str) -> VeilResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(VeilError::config(format!("{name}: expected a boolean, got '{other}'"))),
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, value: &str) -> VeilResult<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| VeilError::config(format!("{name}: {e}")))
}
