//! Configuration for the Redis tier

use std::time::Duration;

/// Configuration for Redis connection and write behavior
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,

    /// Connection pool size
    pub pool_size: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Optional key prefix for all keys (e.g., "myapp")
    pub key_prefix: Option<String>,

    /// Upper bound of random extra TTL added to every write (zero = none)
    pub ttl_jitter: Duration,

    /// Consecutive failures before Redis calls are skipped
    pub failure_threshold: u32,

    /// How long Redis calls are skipped once the breaker opened
    pub reset_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
            key_prefix: None,
            ttl_jitter: Duration::ZERO,
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl RedisConfig {
    /// Create new config with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set pool size
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set key prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Spread expirations by up to `jitter`
    pub fn ttl_jitter(mut self, jitter: Duration) -> Self {
        self.ttl_jitter = jitter;
        self
    }

    /// Configure the circuit breaker
    pub fn circuit_breaker(mut self, failure_threshold: u32, reset_timeout: Duration) -> Self {
        self.failure_threshold = failure_threshold;
        self.reset_timeout = reset_timeout;
        self
    }
}
