//! Structured log events for key mapping-store operations.
//!
//! Each function emits a `tracing` event with structured fields. Original
//! values never appear in any of them.

/// Log a freshly allocated mapping.
pub fn mapping_generated(scope: &str, category: &str, substitute_len: usize) {
    tracing::debug!(
        event = "mapping_generated",
        scope = %scope,
        category = %category,
        substitute_len = substitute_len,
        "mapping generated"
    );
}

/// Log an asynchronous durable write that was lost.
pub fn storage_write_dropped(scope: &str, category: &str, error: &str) {
    tracing::error!(
        event = "storage_write_dropped",
        scope = %scope,
        category = %category,
        error = %error,
        "durable write dropped; mapping exists only in the cache tier"
    );
}

/// Log a cache backend changing to a worse status.
pub fn cache_degraded(backend: &str, status: &str, consecutive_failures: u32, error: &str) {
    tracing::warn!(
        event = "cache_degraded",
        backend = %backend,
        status = %status,
        consecutive_failures = consecutive_failures,
        error = %error,
        "cache backend degraded"
    );
}

/// Log a cache backend coming back.
pub fn cache_recovered(backend: &str, after_failures: u32) {
    tracing::info!(
        event = "cache_recovered",
        backend = %backend,
        after_failures = after_failures,
        "cache backend recovered"
    );
}

/// Log a span left unchanged under tolerant mode.
pub fn span_passed_through(scope: &str, category: &str, error_kind: &str, error: &str) {
    tracing::warn!(
        event = "span_passed_through",
        scope = %scope,
        category = %category,
        error_kind = %error_kind,
        error = %error,
        "span passed through unchanged"
    );
}

/// Log a durable record that disagrees with what this process allocated.
pub fn divergence_detected(scope: &str, category: &str, local_substitute: &str, durable_substitute: &str) {
    tracing::warn!(
        event = "divergence_detected",
        scope = %scope,
        category = %category,
        local_substitute = %local_substitute,
        durable_substitute = %durable_substitute,
        "cache/store divergence detected"
    );
}

/// Log a scope deletion.
pub fn scope_deleted(scope: &str, removed: usize) {
    tracing::info!(
        event = "scope_deleted",
        scope = %scope,
        removed = removed,
        "mapping scope deleted"
    );
}

/// Log expired durable records being purged.
pub fn expired_purged(backend: &str, removed: usize) {
    tracing::info!(
        event = "expired_purged",
        backend = %backend,
        removed = removed,
        "expired durable records purged"
    );
}
