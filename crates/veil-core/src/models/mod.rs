pub mod catalog;
pub mod category;
pub mod detection;
pub mod mapping_entry;
pub mod scope;
pub mod stats;

pub use catalog::{InfoTypeCatalog, InfoTypeCategory};
pub use category::Category;
pub use detection::Detection;
pub use mapping_entry::{InsertOutcome, MappingEntry, StoredMapping};
pub use scope::ScopeId;
pub use stats::{CacheStatus, StatsSnapshot};
