use crate::errors::VeilResult;
use crate::models::Category;

/// What the generator is asked for. The original value is never passed along.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub category: &'a Category,
    pub locale: Option<&'a str>,
    pub seed: Option<u64>,
    /// 0 on the first try, incremented on every collision retry.
    pub attempt: u32,
}

/// External realistic-value generator.
pub trait ISubstituteGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> VeilResult<String>;
}
