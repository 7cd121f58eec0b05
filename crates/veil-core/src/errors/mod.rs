pub mod cache_error;
pub mod crypto_error;
pub mod storage_error;

pub use cache_error::CacheError;
pub use crypto_error::CryptoError;
pub use storage_error::StorageError;

/// Convenience alias used across the workspace.
pub type VeilResult<T> = Result<T, VeilError>;

/// Top-level error type.
///
/// `ConfigurationError`, `AllocationExhausted` and `DecryptionError` are always
/// surfaced to the caller. Everything else is recoverable under tolerant mode.
#[derive(Debug, thiserror::Error)]
pub enum VeilError {
    #[error("configuration error: {reason}")]
    ConfigurationError { reason: String },

    #[error("service unavailable: {service}: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("category not supported: {category}")]
    CategoryNotSupported { category: String },

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("cache error: {0}")]
    CacheError(#[from] CacheError),

    #[error("allocation exhausted for {category} after {attempts} attempts")]
    AllocationExhausted { category: String, attempts: u32 },

    #[error("decryption error: {reason}")]
    DecryptionError { reason: String },

    #[error("serialization error: {reason}")]
    SerializationError { reason: String },
}

impl VeilError {
    /// Shorthand for a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            reason: reason.into(),
        }
    }

    /// Errors that mean the mapping contract cannot be honored safely.
    /// Never downgraded to pass-through, whatever the mode.
    pub fn is_always_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError { .. }
                | Self::AllocationExhausted { .. }
                | Self::DecryptionError { .. }
        )
    }

    /// Errors that tolerant mode may degrade to pass-through for the affected span.
    pub fn is_recoverable(&self) -> bool {
        !self.is_always_fatal()
    }

    /// Short machine-readable label, used in structured logs and per-item statuses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationError { .. } => "configuration_error",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::CategoryNotSupported { .. } => "category_not_supported",
            Self::StorageError(_) => "storage_error",
            Self::CacheError(_) => "cache_error",
            Self::AllocationExhausted { .. } => "allocation_exhausted",
            Self::DecryptionError { .. } => "decryption_error",
            Self::SerializationError { .. } => "serialization_error",
        }
    }
}

impl From<CryptoError> for VeilError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKey { reason } => Self::ConfigurationError {
                reason: format!("invalid encryption key: {reason}"),
            },
            other => Self::DecryptionError {
                reason: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}
