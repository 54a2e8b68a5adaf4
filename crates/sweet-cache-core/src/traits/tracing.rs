use std::fmt::Debug;

use tracing::{debug, warn};

use crate::{CacheError, CacheMonitoring};

/// Monitoring adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMonitoring {
    /// Service name/prefix (optional)
    service_name: Option<String>,
}

impl TracingMonitoring {
    /// Create new tracing monitoring adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMonitoring for TracingMonitoring {
    fn hit(&self, key: &dyn Debug) {
        debug!(
            target: "sweet_cache",
            event = "hit",
            key = ?key,
            service = ?self.service_name,
            "Cache Hit"
        );
    }

    fn stale_hit(&self, key: &dyn Debug) {
        debug!(
            target: "sweet_cache",
            event = "stale_hit",
            key = ?key,
            service = ?self.service_name,
            "Cache Stale Hit"
        );
    }

    fn miss(&self, key: &dyn Debug) {
        debug!(
            target: "sweet_cache",
            event = "miss",
            key = ?key,
            service = ?self.service_name,
            "Cache Miss"
        );
    }

    fn get_failed(&self, key: &dyn Debug, err: &CacheError) {
        warn!(
            target: "sweet_cache",
            event = "get_failed",
            key = ?key,
            error = %err,
            service = ?self.service_name,
            "Cache Read Failed"
        );
    }

    fn put_failed(&self, key: &dyn Debug, err: &CacheError) {
        warn!(
            target: "sweet_cache",
            event = "put_failed",
            key = ?key,
            error = %err,
            service = ?self.service_name,
            "Cache Write Failed"
        );
    }

    fn remove_failed(&self, key: &dyn Debug, err: &CacheError) {
        warn!(
            target: "sweet_cache",
            event = "remove_failed",
            key = ?key,
            error = %err,
            service = ?self.service_name,
            "Cache Remove Failed"
        );
    }

    fn clear_failed(&self, err: &CacheError) {
        warn!(
            target: "sweet_cache",
            event = "clear_failed",
            error = %err,
            service = ?self.service_name,
            "Cache Clear Failed"
        );
    }
}
