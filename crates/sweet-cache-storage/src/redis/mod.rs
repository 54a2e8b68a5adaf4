//! Redis remote tier

mod cache;
mod circuit_breaker;
mod config;

pub use cache::RedisCache;
pub use circuit_breaker::CircuitBreaker;
pub use config::RedisConfig;
