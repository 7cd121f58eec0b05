//! # veil-mapping
//!
//! The mapping core: resolves originals to substitutes and back through the
//! cache tier, the durable store and the allocator, and owns the write
//! propagation policy between the two tiers.
//!
//! ```text
//! resolve_forward:  CACHE_CHECK -> STORE_CHECK -> ALLOCATE -> PERSIST
//! resolve_backward: CACHE_CHECK -> STORE_CHECK -> (miss: leave text alone)
//! ```

pub mod allocator;
pub mod coordinator;
pub mod inflight;
pub mod persist_queue;
pub mod stats;
mod tiers;

pub use allocator::{AllocationContext, AllocationPolicy, Allocator};
pub use coordinator::{CoordinatorSettings, MappingCoordinator};
pub use inflight::InFlightRegistry;
pub use persist_queue::{PersistQueue, PersistQueueStats};
pub use stats::StatsTracker;
