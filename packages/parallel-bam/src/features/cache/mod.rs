//! Block summary cache
//!
//! One entry per (reduced entry state, reduced precision, block). An entry
//! owns the reached set of that block analysis; exit states are attached
//! exactly once, when the analysis finishes.

pub mod block_cache;
pub mod metrics;
pub mod types;

pub use block_cache::BlockCache;
pub use metrics::{CacheCounts, CacheMetrics};
pub use types::{CacheEntry, CacheKey, CacheLookup};
