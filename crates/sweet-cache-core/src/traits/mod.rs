//! Core traits for cache operations

mod cacher;
mod key;
mod monitoring;
mod provider;
mod serializer;
mod store;

#[cfg(feature = "tracing")]
mod tracing;

pub use cacher::Cacher;
pub use key::{CacheKey, CompositeKey};
pub use monitoring::{CacheMonitoring, NoopMonitoring, StatsMonitoring};
pub use provider::{SharedProvider, ValueProvider};
pub use serializer::Serializer;
pub use store::Store;

#[cfg(feature = "json")]
pub use serializer::JsonSerializer;

#[cfg(feature = "msgpack")]
pub use serializer::MsgPackSerializer;

#[cfg(feature = "bincode")]
pub use serializer::BincodeSerializer;

#[cfg(feature = "metrics")]
pub use monitoring::MetricsMonitoring;

#[cfg(feature = "tracing")]
pub use self::tracing::TracingMonitoring;
