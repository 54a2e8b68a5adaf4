//! In-memory store using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sweet_cache_core::{CacheStats, Clock, Result, Store, SystemClock};
use tokio::task::JoinHandle;

use super::ttl_index::DeadlineWheel;

/// Configuration for the memory store
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of entries (0 = unlimited)
    pub max_capacity: usize,
    /// Cleanup interval for expired entries
    pub cleanup_interval: Duration,
    /// Maximum TTL supported (for TTL index sizing)
    pub max_ttl: Duration,
    /// Physical TTL applied by `set`; `None` keeps entries until evicted
    pub default_ttl: Option<Duration>,
    /// Enable TTL index for efficient expiration
    pub enable_ttl_index: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            cleanup_interval: Duration::from_secs(60),
            max_ttl: Duration::from_secs(86400), // 24 hours
            default_ttl: None,
            enable_ttl_index: true,
        }
    }
}

impl MemoryConfig {
    /// Create config with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_capacity: capacity,
            ..Default::default()
        }
    }

    /// Create config with unlimited capacity
    pub fn unlimited() -> Self {
        Self {
            max_capacity: 0,
            ..Default::default()
        }
    }

    /// Set the TTL used by plain `set`
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set the sweep interval of [`MemoryStore::start_cleanup`]
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

/// Internal statistics tracking
#[derive(Debug, Default)]
struct MemoryStats {
    hits: u64,
    misses: u64,
    writes: u64,
    deletes: u64,
    evictions: u64,
}

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Slot<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory store
///
/// Uses `DashMap` for concurrent access and a TTL wheel for efficient
/// expiration. Cloning creates a new handle to the SAME underlying store.
pub struct MemoryStore<K, V> {
    /// Main data store
    data: Arc<DashMap<K, Slot<V>>>,
    /// TTL expiration index
    wheel: Arc<RwLock<DeadlineWheel<K>>>,
    /// Statistics
    stats: Arc<RwLock<MemoryStats>>,
    clock: Arc<dyn Clock>,
    /// Configuration
    config: MemoryConfig,
}

impl<K, V> Clone for MemoryStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            wheel: Arc::clone(&self.wheel),
            stats: Arc::clone(&self.stats),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<K, V> MemoryStore<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new memory store
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store whose physical expiry follows `clock`
    pub fn with_clock(config: MemoryConfig, clock: Arc<dyn Clock>) -> Self {
        let wheel = DeadlineWheel::new(Duration::from_secs(1), config.max_ttl, clock.now());

        Self {
            data: Arc::new(DashMap::with_capacity(config.max_capacity.min(10_000))),
            wheel: Arc::new(RwLock::new(wheel)),
            stats: Arc::new(RwLock::new(MemoryStats::default())),
            clock,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Evict entries if at capacity
    fn maybe_evict(&self, incoming: &K) {
        if self.config.max_capacity == 0 {
            return; // Unlimited
        }

        if self.data.len() < self.config.max_capacity || self.data.contains_key(incoming) {
            return;
        }

        // Expired entries go first
        self.cleanup_expired();
        if self.data.len() < self.config.max_capacity {
            return;
        }

        // Simple eviction: collect keys to remove first
        let overflow = self.data.len().saturating_sub(self.config.max_capacity - 1);
        let keys_to_remove: Vec<K> = self
            .data
            .iter()
            .take(overflow)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys_to_remove {
            if self.data.remove(&key).is_some() {
                self.wheel.write().unschedule(&key);
                self.stats.write().evictions += 1;
            }
        }
    }

    /// Remove an entry and clean up indexes
    fn remove_entry(&self, key: &K) -> bool {
        let removed = self.data.remove(key).is_some();
        if removed {
            self.wheel.write().unschedule(key);
        }
        removed
    }

    fn insert(&self, key: K, value: V, ttl: Option<Duration>) {
        self.maybe_evict(&key);

        let now = self.clock.now();
        // A deadline past what `Instant` can hold is no deadline at all
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| now.checked_add(ttl));

        {
            let mut index = self.wheel.write();
            match expires_at {
                Some(at) if self.config.enable_ttl_index => {
                    index.schedule(key.clone(), at);
                }
                _ => index.unschedule(&key),
            }
        }

        self.data.insert(key, Slot { value, expires_at });
        self.stats.write().writes += 1;
    }

    /// Run TTL cleanup and return number of expired entries removed
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let due = self.wheel.write().advance(now);
        let mut count = 0;

        for key in due {
            let expires_at = match self.data.get(&key) {
                Some(slot) => slot.expires_at,
                None => continue,
            };
            match expires_at {
                Some(at) if now >= at => {
                    if self.data.remove_if(&key, |_, slot| slot.is_expired(now)).is_some() {
                        self.stats.write().evictions += 1;
                        count += 1;
                    }
                }
                // The wheel wrapped: put it back for the remaining time
                Some(at) => self.wheel.write().schedule(key, at),
                None => {}
            }
        }

        count
    }

    /// Spawn a task sweeping expired entries every `cleanup_interval`
    ///
    /// The task runs until the returned handle is aborted.
    pub fn start_cleanup(&self) -> JoinHandle<()> {
        let store = self.clone();
        let interval = self.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.cleanup_expired();
                if removed > 0 {
                    tracing::trace!(removed, "swept expired entries");
                }
            }
        })
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Snapshot of the store's counters
    pub fn stats(&self) -> CacheStats {
        let stats = self.stats.read();
        CacheStats {
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            deletes: stats.deletes,
            evictions: stats.evictions,
            size: self.data.len(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl<K, V> Store<K, V> for MemoryStore<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        let now = self.clock.now();
        let lookup = self
            .data
            .get(key)
            .map(|slot| (!slot.is_expired(now)).then(|| slot.value.clone()));

        let found = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                // Lazily drop the expired entry; a concurrent rewrite survives
                if self.data.remove_if(key, |_, slot| slot.is_expired(now)).is_some() {
                    self.wheel.write().unschedule(key);
                    self.stats.write().evictions += 1;
                }
                None
            }
            None => None,
        };

        let mut stats = self.stats.write();
        match found {
            Some(value) => {
                stats.hits += 1;
                Ok(Some(value))
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: K, value: V) -> Result<bool> {
        self.insert(key, value, self.config.default_ttl);
        Ok(true)
    }

    async fn set_with_ttl(&self, key: K, value: V, ttl: Duration) -> Result<bool> {
        self.insert(key, value, Some(ttl));
        Ok(true)
    }

    async fn remove(&self, key: &K) -> Result<()> {
        if self.remove_entry(key) {
            self.stats.write().deletes += 1;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.data.clear();
        self.wheel.write().clear();
        Ok(())
    }
}
