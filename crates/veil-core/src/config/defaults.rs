// Single source of truth for all default values.

// --- Scope ---
pub const DEFAULT_COLLECTION_NAME: &str = "anonymization_mappings";
pub const DEFAULT_INFO_TYPES: &[&str] = &[
    "PERSON_NAME",
    "EMAIL_ADDRESS",
    "PHONE_NUMBER",
    "CREDIT_CARD_NUMBER",
    "US_SOCIAL_SECURITY_NUMBER",
    "STREET_ADDRESS",
];
pub const DEFAULT_USE_REALISTIC_FAKE_DATA: bool = true;
pub const DEFAULT_HASH_LOOKUP_KEYS: bool = false;

// --- Cache tier ---
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400; // 24 hours
pub const DEFAULT_CACHE_SIZE: u64 = 10_000;
pub const DEFAULT_CACHE_PORT: u16 = 6379;
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_CACHE_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_CREATE_IF_MISSING: bool = false;

// --- Durable store ---
pub const DEFAULT_DB_FILENAME: &str = "veil.db";
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

// --- Coordinator ---
pub const DEFAULT_ASYNC_STORAGE_UPDATES: bool = false;
pub const DEFAULT_PERSIST_QUEUE_CAPACITY: usize = 1_024;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 10;

// --- Observability ---
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const LOG_ENV_VAR: &str = "VEIL_LOG";
