//! sweet-cache: Refresh-ahead caching with request coalescing for Rust
//!
//! # Features
//!
//! - **Stale-while-revalidate**: values are served fresh, then stale while a
//!   background refresh runs, and only recomputed inline once expired
//! - **Per-key coalescing**: concurrent misses share one provider call
//! - **Negative caching** of provider failures with their own TTLs
//! - **Two-level composition** (local tier in front of a remote tier)
//! - **Global key namespacing** for shared remote stores
//! - **Monitoring hooks** (stats, `tracing`, `metrics`)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use sweet_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache: Cache<String, String, _> = Cache::new(MemoryStore::new(MemoryConfig::default()));
//!
//!     let provider = simple_fixed_ttl(
//!         Duration::from_secs(20),
//!         Duration::from_secs(5),
//!         |user: String| async move { Ok::<_, CacheError>(format!("profile of {user}")) },
//!     );
//!
//!     match cache.get_or_provide(&"ada".to_string(), provider).await {
//!         Fetched::Value(profile, _) => println!("Got: {profile}"),
//!         Fetched::Failed(err, _) => println!("Provider failed: {err}"),
//!         Fetched::Default(_) => unreachable!(),
//!     }
//! }
//! ```

// Lets `#[derive(CacheKey)]` resolve `::sweet_cache` inside this crate
extern crate self as sweet_cache;

mod cache;
mod keys;
mod providers;
mod two_level;

// Re-export core
pub use sweet_cache_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use sweet_cache_storage::{MemoryConfig, MemoryStore};

#[cfg(feature = "redis")]
pub use sweet_cache_storage::{CircuitBreaker, RedisCache, RedisConfig};

#[cfg(feature = "derive")]
pub use sweet_cache_derive::CacheKey;

pub use cache::{Cache, CacheConfig};
pub use keys::{KeyPrefix, NamespacedCache};
pub use providers::{
    FixedTtlProvider, FnProvider, TtlPolicy, fixed_ttl, provider_fn, simple_fixed_ttl,
    with_remote_cache,
};
pub use two_level::{RemoteCacheProvider, TwoLevelCache};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Cache, CacheConfig, CacheError, CacheKey, CacheMonitoring, Cacher, CompositeKey, Fetched,
        KeyPrefix, NamespacedCache, NoopMonitoring, Provided, Result, SharedProvider,
        StatsMonitoring, Store, TtlPolicy, Ttls, TwoLevelCache, ValueProvider, fixed_ttl,
        provider_fn, simple_fixed_ttl, with_remote_cache,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryConfig, MemoryStore};

    #[cfg(feature = "redis")]
    pub use crate::{RedisCache, RedisConfig};

    #[cfg(feature = "tracing")]
    pub use crate::TracingMonitoring;

    #[cfg(feature = "metrics")]
    pub use crate::MetricsMonitoring;
}

#[cfg(test)]
mod tests;
