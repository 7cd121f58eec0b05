//! Wires backends, crypto and collaborators together from one `VeilConfig`.

use std::sync::Arc;

use regex::Regex;

use veil_cache::MemoryCacheTier;
use veil_core::config::{CacheType, StorageType, VeilConfig};
use veil_core::errors::{VeilError, VeilResult};
use veil_core::traits::{ICacheTier, IClassifier, IDurableStore, IEndpointResolver, ISubstituteGenerator};
use veil_crypto::{Encryptor, KeyHasher};
use veil_mapping::{Allocator, CoordinatorSettings, MappingCoordinator};
use veil_storage::{MemoryDurableStore, SqliteDurableStore};

use crate::anonymizer::{Anonymizer, TOKEN_PATTERN};

/// Builder for [`Anonymizer`].
///
/// A classifier is always required. A generator is required when
/// `use_realistic_fake_data` is on. Cache and store default to the backends
/// named in the config; `cache` / `store` override them.
pub struct AnonymizerBuilder {
    config: VeilConfig,
    classifier: Option<Arc<dyn IClassifier>>,
    generator: Option<Arc<dyn ISubstituteGenerator>>,
    endpoint_resolver: Option<Arc<dyn IEndpointResolver>>,
    cache: Option<Arc<dyn ICacheTier>>,
    store: Option<Arc<dyn IDurableStore>>,
}

impl AnonymizerBuilder {
    pub fn new(config: VeilConfig) -> Self {
        Self {
            config,
            classifier: None,
            generator: None,
            endpoint_resolver: None,
            cache: None,
            store: None,
        }
    }

    pub fn classifier(mut self, classifier: Arc<dyn IClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn ISubstituteGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Resolver for managed cache instances (`instance_id` + `region`).
    pub fn endpoint_resolver(mut self, resolver: Arc<dyn IEndpointResolver>) -> Self {
        self.endpoint_resolver = Some(resolver);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ICacheTier>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn store(mut self, store: Arc<dyn IDurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate and assemble. Async durable writes need a running tokio runtime.
    pub fn build(self) -> VeilResult<Anonymizer> {
        let config = self.config;
        config.validate()?;

        let classifier = self
            .classifier
            .ok_or_else(|| VeilError::config("a classifier is required"))?;
        let key = config.encryption_key.as_ref();
        let encryptor = Arc::new(Encryptor::new(key)?);
        let hasher = KeyHasher::from_config(config.effective_hash_lookup_keys(), key);
        let allocator = Allocator::from_config(&config, self.generator)?;

        let cache = match self.cache {
            Some(cache) => cache,
            None => build_cache(&config, self.endpoint_resolver.as_deref(), &encryptor)?,
        };
        let store = match self.store {
            Some(store) => store,
            None => build_store(&config)?,
        };
        let token_pattern = Regex::new(TOKEN_PATTERN)
            .map_err(|e| VeilError::config(format!("token pattern: {e}")))?;

        tracing::info!(
            scope = %config.scope(),
            mode = ?config.mode,
            cache = cache.backend_name(),
            store = store.backend_name(),
            policy = ?allocator.policy(),
            encrypted = encryptor.is_active(),
            hashed_keys = hasher.is_hashed(),
            async_writes = config.async_storage_updates,
            "anonymizer ready"
        );

        let coordinator = MappingCoordinator::new(
            CoordinatorSettings::from_config(&config),
            cache,
            store,
            encryptor,
            hasher,
            allocator,
        )?;
        Ok(Anonymizer::from_parts(config, classifier, coordinator, token_pattern))
    }
}

#[cfg(feature = "networked")]
fn build_cache(
    config: &VeilConfig,
    resolver: Option<&dyn IEndpointResolver>,
    encryptor: &Arc<Encryptor>,
) -> VeilResult<Arc<dyn ICacheTier>> {
    match config.cache_type {
        CacheType::Memory => Ok(Arc::new(MemoryCacheTier::new(config.cache_size))),
        CacheType::NetworkedCache => Ok(Arc::new(veil_cache::NetworkedCacheTier::connect(
            &config.cache_config,
            resolver,
            Arc::clone(encryptor),
        )?)),
    }
}

#[cfg(not(feature = "networked"))]
fn build_cache(
    config: &VeilConfig,
    _resolver: Option<&dyn IEndpointResolver>,
    _encryptor: &Arc<Encryptor>,
) -> VeilResult<Arc<dyn ICacheTier>> {
    match config.cache_type {
        CacheType::Memory => Ok(Arc::new(MemoryCacheTier::new(config.cache_size))),
        CacheType::NetworkedCache => Err(VeilError::config(
            "networked-cache requires the `networked` feature",
        )),
    }
}

fn build_store(config: &VeilConfig) -> VeilResult<Arc<dyn IDurableStore>> {
    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryDurableStore::new())),
        StorageType::DocumentCollection => {
            Ok(Arc::new(SqliteDurableStore::from_config(&config.storage_config)?))
        }
    }
}
