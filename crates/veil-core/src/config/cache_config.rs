use serde::{Deserialize, Serialize};

use super::defaults;

/// Which Cache Tier backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheType {
    /// Process-local, lost on restart.
    #[default]
    Memory,
    /// Shared across processes, TTL enforced server-side.
    NetworkedCache,
}

/// Cache tier configuration.
///
/// The networked backend is addressed either by `host`/`port` or by a managed
/// `instance_id` + `region` that an endpoint resolver turns into a host/port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds before a cache entry expires.
    pub ttl: u64,
    pub host: Option<String>,
    pub port: u16,
    pub instance_id: Option<String>,
    pub region: Option<String>,
    /// Forwarded to the endpoint resolver; provisioning itself is out-of-band.
    pub create_if_missing: bool,
    /// Bound on every cache call. Elapsed calls count as misses.
    pub timeout_ms: u64,
    /// Consecutive failures before the backend reports `unavailable`.
    pub failure_threshold: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: defaults::DEFAULT_CACHE_TTL_SECS,
            host: None,
            port: defaults::DEFAULT_CACHE_PORT,
            instance_id: None,
            region: None,
            create_if_missing: defaults::DEFAULT_CREATE_IF_MISSING,
            timeout_ms: defaults::DEFAULT_CACHE_TIMEOUT_MS,
            failure_threshold: defaults::DEFAULT_CACHE_FAILURE_THRESHOLD,
        }
    }
}
