//! Substitute allocation.
//!
//! Two policies share one retry loop: `Realistic` asks the external generator
//! for a plausible value, `Token` builds `<CATEGORY_n>` from a durable
//! per-(scope, category) counter. Every candidate is checked against the
//! scope's reverse index and reserved before it is returned; running out of
//! attempts is an `AllocationExhausted` error, never a reused value.

use std::future::Future;
use std::sync::Arc;

use veil_core::config::{GeneratorConfig, VeilConfig};
use veil_core::errors::{VeilError, VeilResult};
use veil_core::models::Category;
use veil_core::traits::{GenerationRequest, ISubstituteGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPolicy {
    Realistic,
    Token,
}

impl AllocationPolicy {
    pub fn from_config(config: &VeilConfig) -> Self {
        if config.use_realistic_fake_data {
            Self::Realistic
        } else {
            Self::Token
        }
    }
}

/// What the allocator needs from the scope it allocates in.
pub trait AllocationContext {
    /// True when `candidate` may not be used (already owned in the scope).
    fn is_taken(&self, candidate: &str) -> impl Future<Output = VeilResult<bool>> + Send;

    /// Claim `candidate` for this allocation. False when a concurrent
    /// allocation claimed it first.
    fn reserve(&self, candidate: &str) -> bool;

    /// Next value of the durable token counter for the category.
    fn next_sequence(&self) -> impl Future<Output = VeilResult<u64>> + Send;
}

pub struct Allocator {
    policy: AllocationPolicy,
    generator: Option<Arc<dyn ISubstituteGenerator>>,
    generator_config: GeneratorConfig,
    max_attempts: u32,
}

impl Allocator {
    /// The realistic policy needs a generator.
    pub fn new(
        policy: AllocationPolicy,
        generator: Option<Arc<dyn ISubstituteGenerator>>,
        generator_config: GeneratorConfig,
        max_attempts: u32,
    ) -> VeilResult<Self> {
        if policy == AllocationPolicy::Realistic && generator.is_none() {
            return Err(VeilError::config(
                "use_realistic_fake_data requires a substitute generator",
            ));
        }
        Ok(Self {
            policy,
            generator,
            generator_config,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn from_config(
        config: &VeilConfig,
        generator: Option<Arc<dyn ISubstituteGenerator>>,
    ) -> VeilResult<Self> {
        Self::new(
            AllocationPolicy::from_config(config),
            generator,
            config.generator.clone(),
            config.max_allocation_attempts,
        )
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// `<LABEL_n>` placeholder for a category.
    pub fn token(category: &Category, n: u64) -> String {
        format!("<{}_{n}>", category.token_label())
    }

    /// Produce a fresh, reserved substitute for `category`.
    pub async fn allocate<C>(&self, category: &Category, ctx: &C) -> VeilResult<String>
    where
        C: AllocationContext + Sync,
    {
        for attempt in 0..self.max_attempts {
            let candidate = match self.policy {
                AllocationPolicy::Token => Self::token(category, ctx.next_sequence().await?),
                AllocationPolicy::Realistic => self.generate(category, attempt)?,
            };
            if candidate.is_empty() || ctx.is_taken(&candidate).await? {
                tracing::debug!(category = %category, attempt, "substitute collision, retrying");
                continue;
            }
            if ctx.reserve(&candidate) {
                return Ok(candidate);
            }
        }
        Err(VeilError::AllocationExhausted {
            category: category.to_string(),
            attempts: self.max_attempts,
        })
    }

    fn generate(&self, category: &Category, attempt: u32) -> VeilResult<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| VeilError::config("no substitute generator configured"))?;
        generator.generate(&GenerationRequest {
            category,
            locale: self.generator_config.locale.as_deref(),
            seed: self.generator_config.seed,
            attempt,
        })
    }
}
