//! # veil-cache
//!
//! Cache Tier backends. The tier is a performance-only projection of the
//! durable store: absence means "ask the store", never "no mapping".
//!
//! - [`MemoryCacheTier`]: process-local moka caches with per-entry TTL.
//! - `NetworkedCacheTier` (feature `networked`): redis, shared across
//!   processes, TTL enforced server-side.

pub mod health;
pub mod keys;
pub mod memory;
#[cfg(feature = "networked")]
pub mod networked;

pub use health::HealthTracker;
pub use memory::MemoryCacheTier;
#[cfg(feature = "networked")]
pub use networked::{resolve_endpoint, NetworkedCacheTier};
