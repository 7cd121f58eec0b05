pub mod cache;
pub mod classifier;
pub mod endpoint;
pub mod generator;
pub mod store;

pub use cache::ICacheTier;
pub use classifier::IClassifier;
pub use endpoint::{CacheEndpoint, IEndpointResolver};
pub use generator::{GenerationRequest, ISubstituteGenerator};
pub use store::IDurableStore;
