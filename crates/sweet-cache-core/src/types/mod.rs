//! Core types for cache operations

mod entry;
mod fetched;
mod stats;

pub use entry::{CacheItem, Freshness};
pub use fetched::{Fetched, Provided, Ttls};
pub use stats::CacheStats;
