//! Strict vs tolerant handling of per-span failures.

use veil_core::config::AnonymizerMode;
use veil_core::errors::{VeilError, VeilResult};
use veil_core::models::ScopeId;
use veil_observability::tracing_setup::events;

use crate::result::SpanError;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ModePolicy {
    mode: AnonymizerMode,
}

impl ModePolicy {
    pub fn new(mode: AnonymizerMode) -> Self {
        Self { mode }
    }

    /// Decide the fate of a failed span. `Ok` means the span passes through
    /// unchanged and the returned record goes into the item status.
    ///
    /// Always-fatal errors surface in either mode.
    pub fn absorb(&self, scope: &ScopeId, category: Option<&str>, err: VeilError) -> VeilResult<SpanError> {
        if self.mode == AnonymizerMode::Strict || err.is_always_fatal() {
            return Err(err);
        }
        events::span_passed_through(scope.as_str(), category.unwrap_or("-"), err.kind(), &err.to_string());
        Ok(SpanError::new(category, &err))
    }
}

#[cfg(test)]
mod tests {
    use veil_core::errors::StorageError;

    use super::*;

    fn storage_down() -> VeilError {
        StorageError::Unavailable {
            reason: "down".into(),
        }
        .into()
    }

    #[test]
    fn strict_surfaces_recoverable_errors() {
        let policy = ModePolicy::new(AnonymizerMode::Strict);
        let err = policy.absorb(&ScopeId::new("s"), Some("EMAIL_ADDRESS"), storage_down()).unwrap_err();
        assert_eq!(err.kind(), "storage_error");
    }

    #[test]
    fn tolerant_absorbs_recoverable_errors() {
        let policy = ModePolicy::new(AnonymizerMode::Tolerant);
        let record = policy.absorb(&ScopeId::new("s"), Some("EMAIL_ADDRESS"), storage_down()).unwrap();
        assert_eq!(record.kind, "storage_error");
        assert_eq!(record.category.as_deref(), Some("EMAIL_ADDRESS"));
    }

    #[test]
    fn tolerant_never_absorbs_fatal_errors() {
        let policy = ModePolicy::new(AnonymizerMode::Tolerant);
        let fatal = VeilError::AllocationExhausted {
            category: "EMAIL_ADDRESS".into(),
            attempts: 3,
        };
        assert!(policy.absorb(&ScopeId::new("s"), None, fatal).is_err());
        let fatal = VeilError::DecryptionError {
            reason: "bad tag".into(),
        };
        assert!(policy.absorb(&ScopeId::new("s"), None, fatal).is_err());
    }
}
