//! # veil
//!
//! Reversible anonymization over a two-tier mapping store.
//!
//! [`Anonymizer`] replaces classifier-detected sensitive spans with stable
//! substitutes and maps them back on the way out. Within one scope (the
//! configured collection) every original has exactly one substitute and every
//! substitute exactly one original.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use veil::{Anonymizer, VeilConfig};
//! # async fn run(classifier: Arc<dyn veil::IClassifier>) -> veil::VeilResult<()> {
//! let config = VeilConfig::from_env()?;
//! let anonymizer = Anonymizer::builder(config).classifier(classifier).build()?;
//! let masked = anonymizer.anonymize("Contact me at alice@corp.com").await?;
//! let restored = anonymizer.deanonymize(&masked).await?;
//! # Ok(())
//! # }
//! ```

pub mod anonymizer;
pub mod builder;
mod policy;
pub mod result;

pub use anonymizer::Anonymizer;
pub use builder::AnonymizerBuilder;
pub use result::{AnonymizationResult, AnonymizationStats, BatchItem, BatchResult, ItemStatus, SpanError};

pub use veil_core::config::{AnonymizerMode, CacheType, EncryptionKey, StorageType, VeilConfig};
pub use veil_core::errors::{VeilError, VeilResult};
pub use veil_core::models::{CacheStatus, Category, Detection, InfoTypeCategory, ScopeId};
pub use veil_core::traits::{
    CacheEndpoint, GenerationRequest, IClassifier, ICacheTier, IDurableStore, IEndpointResolver,
    ISubstituteGenerator,
};
pub use veil_mapping::PersistQueueStats;
pub use veil_observability::tracing_setup::{init_tracing, init_tracing_with_filter};
