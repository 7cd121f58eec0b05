/// Veil system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of every key written to a shared (networked) cache backend.
pub const CACHE_KEY_PREFIX: &str = "veil";

/// Context string for deriving the value-encryption key from the configured secret.
pub const ENCRYPTION_KEY_CONTEXT: &str = "veil 2024-05 mapping-store value encryption";

/// Context string for deriving the lookup-key hashing key from the configured secret.
pub const LOOKUP_KEY_CONTEXT: &str = "veil 2024-05 mapping-store lookup key";

/// Upper bound on batch concurrency regardless of configuration.
pub const MAX_BATCH_CONCURRENCY: usize = 256;

/// Upper bound on allocation retries regardless of configuration.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 1_000;
