//! Redis-backed cache tier, shared across processes.
//!
//! Each mapping is stored twice (forward key and token key) as a JSON payload
//! with `SET .. EX`, so expiry is enforced by the server. Originals inside the
//! payload go through the [`Encryptor`], so they are ciphertext whenever a key
//! is configured.
//!
//! The connection is opened lazily and dropped on any error; the next call
//! reconnects. Every failure feeds the [`HealthTracker`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::{Commands, Connection, RedisError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use veil_core::config::CacheConfig;
use veil_core::errors::{CacheError, VeilError, VeilResult};
use veil_core::models::{CacheStatus, Category, MappingEntry, ScopeId};
use veil_core::traits::{CacheEndpoint, ICacheTier, IEndpointResolver};
use veil_crypto::Encryptor;

use crate::health::HealthTracker;
use crate::keys;

const BACKEND: &str = "networked";
const DELETE_CHUNK: usize = 500;

/// Wire form of a cached mapping.
#[derive(Debug, Serialize, Deserialize)]
struct CachedPayload {
    scope: ScopeId,
    category: Category,
    lookup_key: String,
    substitute_value: String,
    sealed_original: String,
    encrypted: bool,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

/// Pick the endpoint from config: explicit host first, then a managed
/// instance resolved through `resolver`.
pub fn resolve_endpoint(
    config: &CacheConfig,
    resolver: Option<&dyn IEndpointResolver>,
) -> VeilResult<CacheEndpoint> {
    if let Some(host) = config.host.as_deref().filter(|h| !h.is_empty()) {
        return Ok(CacheEndpoint {
            host: host.to_string(),
            port: config.port,
        });
    }
    match (&config.instance_id, &config.region) {
        (Some(instance_id), Some(region)) => {
            let resolver = resolver.ok_or_else(|| {
                VeilError::config(format!(
                    "cache instance '{instance_id}' needs an endpoint resolver"
                ))
            })?;
            resolver.resolve(instance_id, region, config.create_if_missing)
        }
        _ => Err(VeilError::config(
            "networked-cache requires cache_config.host or cache_config.instance_id + region",
        )),
    }
}

pub struct NetworkedCacheTier {
    client: redis::Client,
    connection: Mutex<Option<Connection>>,
    endpoint: CacheEndpoint,
    timeout: Duration,
    encryptor: Arc<Encryptor>,
    health: HealthTracker,
}

impl NetworkedCacheTier {
    /// Build the tier and try a first connection.
    ///
    /// An unreachable backend is not an error here: the tier starts degraded and
    /// every call reports a miss until the backend comes back.
    pub fn connect(
        config: &CacheConfig,
        resolver: Option<&dyn IEndpointResolver>,
        encryptor: Arc<Encryptor>,
    ) -> VeilResult<Self> {
        let endpoint = resolve_endpoint(config, resolver)?;
        let url = format!("redis://{}:{}/", endpoint.host, endpoint.port);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| VeilError::config(format!("invalid cache endpoint {url}: {e}")))?;

        let tier = Self {
            client,
            connection: Mutex::new(None),
            endpoint,
            timeout: Duration::from_millis(config.timeout_ms),
            encryptor,
            health: HealthTracker::new(BACKEND, config.failure_threshold),
        };
        if let Err(e) = tier.with_connection(|conn| redis::cmd("PING").query::<String>(conn)) {
            debug!(host = %tier.endpoint.host, port = tier.endpoint.port, error = %e, "cache backend not reachable at startup");
        }
        Ok(tier)
    }

    pub fn endpoint(&self) -> &CacheEndpoint {
        &self.endpoint
    }

    fn open(&self) -> Result<Connection, RedisError> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        Ok(conn)
    }

    /// Run `op` on the shared connection, reconnecting first if needed.
    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, RedisError>,
    ) -> VeilResult<T> {
        let mut guard = self.connection.lock().map_err(|_| CacheError::Backend {
            message: "connection lock poisoned".into(),
        })?;

        if guard.is_none() {
            match self.open() {
                Ok(conn) => *guard = Some(conn),
                Err(e) => {
                    self.health.record_failure(&e.to_string());
                    return Err(self.to_cache_err(e).into());
                }
            }
        }

        let result = match guard.as_mut() {
            Some(conn) => op(conn),
            None => {
                return Err(CacheError::Unavailable {
                    reason: "no connection".into(),
                }
                .into())
            }
        };
        match result {
            Ok(value) => {
                self.health.record_success();
                Ok(value)
            }
            Err(e) => {
                *guard = None;
                self.health.record_failure(&e.to_string());
                Err(self.to_cache_err(e).into())
            }
        }
    }

    fn to_cache_err(&self, e: RedisError) -> CacheError {
        if e.is_timeout() {
            CacheError::Timeout {
                operation: "redis".into(),
                millis: self.timeout.as_millis() as u64,
            }
        } else if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            CacheError::Unavailable {
                reason: e.to_string(),
            }
        } else {
            CacheError::Backend {
                message: e.to_string(),
            }
        }
    }

    fn decode(&self, raw: Option<String>, scope: &ScopeId) -> VeilResult<Option<MappingEntry>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let payload: CachedPayload =
            serde_json::from_str(&raw).map_err(|e| CacheError::MalformedPayload {
                reason: e.to_string(),
            })?;
        if &payload.scope != scope {
            return Ok(None);
        }
        let original = self
            .encryptor
            .decrypt(&payload.sealed_original, payload.encrypted)?;
        Ok(Some(MappingEntry {
            scope: payload.scope,
            category: payload.category,
            original_value: original,
            lookup_key: payload.lookup_key,
            substitute_value: payload.substitute_value,
            created_at: payload.created_at,
            expires_at: payload.expires_at,
        }))
    }
}

impl ICacheTier for NetworkedCacheTier {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn get(
        &self,
        scope: &ScopeId,
        category: &Category,
        lookup_key: &str,
    ) -> VeilResult<Option<MappingEntry>> {
        let key = keys::forward_key(scope, category, lookup_key);
        let raw: Option<String> = self.with_connection(|conn| conn.get(&key))?;
        self.decode(raw, scope)
    }

    fn get_by_token(&self, scope: &ScopeId, substitute: &str) -> VeilResult<Option<MappingEntry>> {
        let key = keys::token_key(scope, substitute);
        let raw: Option<String> = self.with_connection(|conn| conn.get(&key))?;
        self.decode(raw, scope)
    }

    fn put(&self, entry: &MappingEntry, ttl: Duration) -> VeilResult<()> {
        let (sealed_original, encrypted) = self.encryptor.encrypt(&entry.original_value)?;
        let entry = entry.with_ttl(ttl);
        let payload = serde_json::to_string(&CachedPayload {
            scope: entry.scope.clone(),
            category: entry.category.clone(),
            lookup_key: entry.lookup_key.clone(),
            substitute_value: entry.substitute_value.clone(),
            sealed_original,
            encrypted,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        })?;
        let seconds = ttl.as_secs().max(1);
        let forward = keys::forward_key(&entry.scope, &entry.category, &entry.lookup_key);
        let token = keys::token_key(&entry.scope, &entry.substitute_value);

        self.with_connection(|conn| {
            redis::pipe()
                .atomic()
                .cmd("SET")
                .arg(&forward)
                .arg(&payload)
                .arg("EX")
                .arg(seconds)
                .ignore()
                .cmd("SET")
                .arg(&token)
                .arg(&payload)
                .arg("EX")
                .arg(seconds)
                .ignore()
                .query::<()>(conn)
        })
    }

    fn invalidate(&self, entry: &MappingEntry) -> VeilResult<()> {
        let forward = keys::forward_key(&entry.scope, &entry.category, &entry.lookup_key);
        let token = keys::token_key(&entry.scope, &entry.substitute_value);
        self.with_connection(|conn| conn.del::<_, ()>(vec![forward, token]))
    }

    fn invalidate_scope(&self, scope: &ScopeId) -> VeilResult<()> {
        let pattern = keys::scope_pattern(scope);
        let doomed: Vec<String> = self.with_connection(|conn| {
            let keys: Vec<String> = conn.scan_match::<_, String>(&pattern)?.collect();
            Ok(keys)
        })?;
        for chunk in doomed.chunks(DELETE_CHUNK) {
            self.with_connection(|conn| conn.del::<_, ()>(chunk.to_vec()))?;
        }
        debug!(scope = %scope, removed = doomed.len(), "invalidated networked cache scope");
        Ok(())
    }

    fn evict_expired(&self) -> VeilResult<()> {
        Ok(())
    }

    fn status(&self) -> CacheStatus {
        self.health.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticResolver;

    impl IEndpointResolver for StaticResolver {
        fn resolve(&self, instance_id: &str, region: &str, _create: bool) -> VeilResult<CacheEndpoint> {
            Ok(CacheEndpoint {
                host: format!("{instance_id}.{region}.internal"),
                port: 6380,
            })
        }
    }

    #[test]
    fn explicit_host_wins() {
        let config = CacheConfig {
            host: Some("10.0.0.5".into()),
            instance_id: Some("ignored".into()),
            region: Some("ignored".into()),
            ..CacheConfig::default()
        };
        let endpoint = resolve_endpoint(&config, Some(&StaticResolver)).unwrap();
        assert_eq!(endpoint.host, "10.0.0.5");
        assert_eq!(endpoint.port, 6379);
    }

    #[test]
    fn managed_instance_goes_through_resolver() {
        let config = CacheConfig {
            instance_id: Some("anonymizer-cache".into()),
            region: Some("us-central1".into()),
            ..CacheConfig::default()
        };
        let endpoint = resolve_endpoint(&config, Some(&StaticResolver)).unwrap();
        assert_eq!(endpoint.host, "anonymizer-cache.us-central1.internal");
        assert_eq!(endpoint.port, 6380);
    }

    #[test]
    fn managed_instance_without_resolver_is_config_error() {
        let config = CacheConfig {
            instance_id: Some("anonymizer-cache".into()),
            region: Some("us-central1".into()),
            ..CacheConfig::default()
        };
        let err = resolve_endpoint(&config, None).unwrap_err();
        assert!(matches!(err, VeilError::ConfigurationError { .. }));
    }

    #[test]
    fn unreachable_backend_degrades_instead_of_failing() {
        let config = CacheConfig {
            host: Some("127.0.0.1".into()),
            port: 1,
            timeout_ms: 100,
            failure_threshold: 2,
            ..CacheConfig::default()
        };
        let tier = NetworkedCacheTier::connect(&config, None, Arc::new(Encryptor::disabled())).unwrap();
        assert_ne!(tier.status(), CacheStatus::Connected);

        let err = tier
            .get(&ScopeId::new("s"), &Category::new("EMAIL_ADDRESS"), "k")
            .unwrap_err();
        assert!(matches!(err, VeilError::CacheError(_)));
        assert_eq!(tier.status(), CacheStatus::Unavailable);
    }
}
