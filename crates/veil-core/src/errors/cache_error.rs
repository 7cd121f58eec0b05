/// Cache-tier errors. The coordinator treats all of these as misses.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {message}")]
    Backend { message: String },

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("cache payload malformed: {reason}")]
    MalformedPayload { reason: String },
}
