use crate::errors::VeilResult;
use crate::models::{Category, Detection};

/// External sensitive-span classifier.
///
/// Unreachable services should surface as `VeilError::ServiceUnavailable`.
pub trait IClassifier: Send + Sync {
    fn detect(&self, text: &str, info_types: &[Category]) -> VeilResult<Vec<Detection>>;
}
