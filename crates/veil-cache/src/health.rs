//! Consecutive-failure tracking for a cache backend.

use std::sync::atomic::{AtomicU32, Ordering};

use veil_core::models::CacheStatus;
use veil_observability::tracing_setup::events;

/// Derives [`CacheStatus`] from the run of consecutive failed calls.
///
/// 0 failures is `connected`, fewer than the threshold is `degraded`, and the
/// threshold or more is `unavailable`. Any success resets the run.
#[derive(Debug)]
pub struct HealthTracker {
    backend: &'static str,
    threshold: u32,
    consecutive_failures: AtomicU32,
}

impl HealthTracker {
    pub fn new(backend: &'static str, threshold: u32) -> Self {
        Self {
            backend,
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn record_success(&self) {
        let previous = self.consecutive_failures.swap(0, Ordering::Relaxed);
        if previous > 0 {
            events::cache_recovered(self.backend, previous);
        }
    }

    pub fn record_failure(&self, error: &str) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        // Only log on status transitions.
        if failures == 1 || failures == self.threshold {
            events::cache_degraded(
                self.backend,
                &Self::status_for(failures, self.threshold).to_string(),
                failures,
                error,
            );
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> CacheStatus {
        Self::status_for(self.consecutive_failures(), self.threshold)
    }

    fn status_for(failures: u32, threshold: u32) -> CacheStatus {
        match failures {
            0 => CacheStatus::Connected,
            n if n < threshold => CacheStatus::Degraded,
            _ => CacheStatus::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_failure_run() {
        let health = HealthTracker::new("test", 3);
        assert_eq!(health.status(), CacheStatus::Connected);
        health.record_failure("refused");
        assert_eq!(health.status(), CacheStatus::Degraded);
        health.record_failure("refused");
        health.record_failure("refused");
        assert_eq!(health.status(), CacheStatus::Unavailable);
        health.record_success();
        assert_eq!(health.status(), CacheStatus::Connected);
        assert_eq!(health.consecutive_failures(), 0);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let health = HealthTracker::new("test", 0);
        health.record_failure("refused");
        assert_eq!(health.status(), CacheStatus::Unavailable);
    }
}
