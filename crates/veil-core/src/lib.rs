//! # veil-core
//!
//! Foundation crate for the Veil reversible mapping store.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{AnonymizerMode, VeilConfig};
pub use errors::{VeilError, VeilResult};
pub use models::{Category, MappingEntry, ScopeId, StatsSnapshot, StoredMapping};
