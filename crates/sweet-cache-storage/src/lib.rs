//! sweet-cache-storage: Stores and remote tiers for sweet-cache

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "memory")]
pub use memory::{MemoryConfig, MemoryStore};

#[cfg(feature = "redis")]
pub use self::redis::{CircuitBreaker, RedisCache, RedisConfig};
