//! Monitoring hooks for cache observability

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{CacheError, CacheStats};

/// Receives cache events
///
/// Implement this to integrate with your metrics or logging system. Hooks
/// are called inline and must not block; they never change what the cache
/// returns.
pub trait CacheMonitoring: Send + Sync + 'static {
    /// A fresh entry was served
    fn hit(&self, key: &dyn Debug);

    /// A stale entry was served while a refresh runs
    fn stale_hit(&self, key: &dyn Debug) {
        self.hit(key)
    }

    /// Nothing usable was cached
    fn miss(&self, key: &dyn Debug);

    /// Reading from the store failed; the read was treated as a miss
    fn get_failed(&self, key: &dyn Debug, err: &CacheError);

    /// Writing to the store failed or was rejected
    fn put_failed(&self, key: &dyn Debug, err: &CacheError);

    /// Deleting from the store failed
    fn remove_failed(&self, key: &dyn Debug, err: &CacheError);

    /// Clearing the store failed
    fn clear_failed(&self, err: &CacheError);
}

impl<M: CacheMonitoring + ?Sized> CacheMonitoring for Arc<M> {
    fn hit(&self, key: &dyn Debug) {
        (**self).hit(key)
    }

    fn stale_hit(&self, key: &dyn Debug) {
        (**self).stale_hit(key)
    }

    fn miss(&self, key: &dyn Debug) {
        (**self).miss(key)
    }

    fn get_failed(&self, key: &dyn Debug, err: &CacheError) {
        (**self).get_failed(key, err)
    }

    fn put_failed(&self, key: &dyn Debug, err: &CacheError) {
        (**self).put_failed(key, err)
    }

    fn remove_failed(&self, key: &dyn Debug, err: &CacheError) {
        (**self).remove_failed(key, err)
    }

    fn clear_failed(&self, err: &CacheError) {
        (**self).clear_failed(err)
    }
}

/// No-op monitoring (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitoring;

impl CacheMonitoring for NoopMonitoring {
    #[inline]
    fn hit(&self, _key: &dyn Debug) {}

    #[inline]
    fn miss(&self, _key: &dyn Debug) {}

    #[inline]
    fn get_failed(&self, _key: &dyn Debug, _err: &CacheError) {}

    #[inline]
    fn put_failed(&self, _key: &dyn Debug, _err: &CacheError) {}

    #[inline]
    fn remove_failed(&self, _key: &dyn Debug, _err: &CacheError) {}

    #[inline]
    fn clear_failed(&self, _err: &CacheError) {}
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

/// In-process counters, readable as [`CacheStats`]
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct StatsMonitoring {
    counters: Arc<Counters>,
}

impl StatsMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            stale_hits: self.counters.stale_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            ..Default::default()
        }
    }

    /// Reset every counter to zero
    pub fn reset(&self) {
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.stale_hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.failures.store(0, Ordering::Relaxed);
    }

    fn failure(&self) {
        self.counters.failures.fetch_add(1, Ordering::Relaxed);
    }
}

impl CacheMonitoring for StatsMonitoring {
    fn hit(&self, _key: &dyn Debug) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn stale_hit(&self, _key: &dyn Debug) {
        self.counters.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self, _key: &dyn Debug) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn get_failed(&self, _key: &dyn Debug, _err: &CacheError) {
        self.failure();
    }

    fn put_failed(&self, _key: &dyn Debug, _err: &CacheError) {
        self.failure();
    }

    fn remove_failed(&self, _key: &dyn Debug, _err: &CacheError) {
        self.failure();
    }

    fn clear_failed(&self, _err: &CacheError) {
        self.failure();
    }
}

/// Monitoring adapter using the `metrics` crate
///
/// Integrates with Prometheus, StatsD, and other exporters via the `metrics` ecosystem.
///
/// # Example
/// ```ignore
/// use sweet_cache_core::MetricsMonitoring;
///
/// // Set up a metrics recorder (e.g., prometheus_exporter)
/// // metrics::set_global_recorder(recorder);
///
/// let monitoring = MetricsMonitoring::new("sweet_cache");
/// // Emits: sweet_cache_hits_total, sweet_cache_misses_total, etc.
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsMonitoring {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsMonitoring {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    fn failure(&self, op: &'static str) {
        metrics::counter!(self.metric_name("failures_total"), "op" => op).increment(1);
    }
}

#[cfg(feature = "metrics")]
impl CacheMonitoring for MetricsMonitoring {
    fn hit(&self, _key: &dyn Debug) {
        metrics::counter!(self.metric_name("hits_total")).increment(1);
    }

    fn stale_hit(&self, _key: &dyn Debug) {
        metrics::counter!(self.metric_name("stale_hits_total")).increment(1);
    }

    fn miss(&self, _key: &dyn Debug) {
        metrics::counter!(self.metric_name("misses_total")).increment(1);
    }

    fn get_failed(&self, _key: &dyn Debug, _err: &CacheError) {
        self.failure("get");
    }

    fn put_failed(&self, _key: &dyn Debug, _err: &CacheError) {
        self.failure("put");
    }

    fn remove_failed(&self, _key: &dyn Debug, _err: &CacheError) {
        self.failure("remove");
    }

    fn clear_failed(&self, _err: &CacheError) {
        self.failure("clear");
    }
}
