//! Single-tier refresh-ahead cache

use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use sweet_cache_core::{
    CacheError, CacheItem, CacheMonitoring, Cacher, Clock, Fetched, Freshness, NoopMonitoring,
    Result, SharedProvider, Store, SystemClock,
};

mod coalescer;
mod tasks;

use coalescer::Coalescer;
use tasks::BackgroundTasks;

/// Configuration for [`Cache`]
#[derive(Clone)]
pub struct CacheConfig {
    /// Upper bound for a detached refresh; `None` lets it run to completion
    pub refresh_timeout: Option<Duration>,
    /// Time source used to classify entries
    pub clock: Arc<dyn Clock>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_timeout: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("refresh_timeout", &self.refresh_timeout)
            .finish_non_exhaustive()
    }
}

impl CacheConfig {
    /// Use `clock` instead of the system clock
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Abandon detached refreshes that run longer than `timeout`
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }
}

/// Refresh-ahead cache in front of a value provider
///
/// Entries are fresh until their actual TTL, stale-but-usable until their
/// usable TTL and expired afterwards. Fresh entries are served directly,
/// stale ones are served while a detached task refreshes them, and missing
/// or expired ones are produced by one coalesced provider call per key.
///
/// Generic over:
/// - `K`: the key type
/// - `V`: the cached value
/// - `S`: the store holding [`CacheItem`]s
/// - `M`: the monitoring sink
///
/// Cloning creates a new handle to the SAME cache.
pub struct Cache<K, V, S, M = NoopMonitoring> {
    store: Arc<S>,
    monitoring: Arc<M>,
    clock: Arc<dyn Clock>,
    refresh_timeout: Option<Duration>,
    coalescer: Coalescer<K, Fetched<V>>,
    tasks: BackgroundTasks,
}

impl<K, V, S, M> Clone for Cache<K, V, S, M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            monitoring: Arc::clone(&self.monitoring),
            clock: Arc::clone(&self.clock),
            refresh_timeout: self.refresh_timeout,
            coalescer: self.coalescer.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

impl<K, V, S> Cache<K, V, S, NoopMonitoring>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Store<K, CacheItem<V>>,
{
    /// Create a cache over `store` with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    /// Create with custom config
    pub fn with_config(store: S, config: CacheConfig) -> Self {
        Self::with_monitoring(store, NoopMonitoring, config)
    }
}

impl<K, V, S, M> Cache<K, V, S, M>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Store<K, CacheItem<V>>,
    M: CacheMonitoring,
{
    /// Create a cache reporting to `monitoring`
    pub fn with_monitoring(store: S, monitoring: M, config: CacheConfig) -> Self {
        Self {
            store: Arc::new(store),
            monitoring: Arc::new(monitoring),
            clock: config.clock,
            refresh_timeout: config.refresh_timeout,
            coalescer: Coalescer::new(),
            tasks: BackgroundTasks::default(),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The monitoring sink
    pub fn monitoring(&self) -> &M {
        &self.monitoring
    }

    /// Resolve once every detached refresh spawned by this cache finished
    pub async fn wait_for_refreshes(&self) {
        self.tasks.wait_idle().await
    }

    /// Number of detached refreshes still running
    pub fn pending_refreshes(&self) -> usize {
        self.tasks.pending()
    }

    /// Read the entry; a failed read counts as a miss
    async fn lookup(&self, key: &K) -> Option<CacheItem<V>> {
        match self.store.get(key).await {
            Ok(item) => item,
            Err(err) => {
                self.monitoring.get_failed(key, &err);
                None
            }
        }
    }

    /// Serve a fresh or stale entry, scheduling a refresh for stale ones
    async fn serve_cached(
        &self,
        key: &K,
        provider: &SharedProvider<K, V>,
        now: Instant,
    ) -> Option<Fetched<V>> {
        let item = self.lookup(key).await?;
        match item.freshness(now) {
            Freshness::Fresh => {
                self.monitoring.hit(key);
                Some(item.fetched(now))
            }
            Freshness::Stale => {
                self.monitoring.stale_hit(key);
                self.spawn_update(key, provider, now);
                Some(item.fetched(now))
            }
            Freshness::Expired => None,
        }
    }

    /// Start a detached coalesced update unless one already runs
    fn spawn_update(&self, key: &K, provider: &SharedProvider<K, V>, now: Instant) {
        // Claimed here so that readers arriving before the task runs skip it
        let Some(flight) = self.coalescer.try_lead(key) else {
            trace!(key = ?key, "update already in flight");
            return;
        };

        let this = self.clone();
        let key = key.clone();
        let provider = Arc::clone(provider);
        self.tasks.spawn(async move {
            let update = flight.complete(this.update(&key, provider, now));
            match this.refresh_timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, update).await.is_err() {
                        debug!(key = ?key, timeout = ?limit, "background refresh timed out");
                    }
                }
                None => {
                    update.await;
                }
            }
        });
    }

    async fn coalesced_update(
        &self,
        key: &K,
        provider: SharedProvider<K, V>,
        now: Instant,
    ) -> Fetched<V> {
        self.coalescer.run(key, || self.update(key, provider, now)).await
    }

    /// Produce a new entry for `key`; runs at most once at a time per key
    async fn update(&self, key: &K, provider: SharedProvider<K, V>, now: Instant) -> Fetched<V> {
        // An update that finished after `now` was read already did the work
        if let Some(item) = self.lookup(key).await {
            if item.freshness(now) == Freshness::Fresh {
                trace!(key = ?key, "entry refreshed concurrently");
                return item.fetched(now);
            }
        }

        let provided = provider.provide(key).await;
        let written_at = self.clock.now();
        let item = CacheItem::from_provided(provided, written_at);
        let fetched = item.fetched(written_at);

        let store_ttl = item.store_ttl(written_at);
        if store_ttl.is_zero() {
            trace!(key = ?key, "zero usable ttl, entry not stored");
            return fetched;
        }

        match self.store.set_with_ttl(key.clone(), item, store_ttl).await {
            Ok(true) => {}
            Ok(false) => {
                let err = CacheError::Backend("store rejected the entry".to_string());
                self.monitoring.put_failed(key, &err);
            }
            Err(err) => self.monitoring.put_failed(key, &err),
        }
        fetched
    }

    /// Return the cached outcome for `key`, calling `provider` on a miss
    pub async fn get_or_provide(&self, key: &K, provider: SharedProvider<K, V>) -> Fetched<V> {
        let now = self.clock.now();
        if let Some(cached) = self.serve_cached(key, &provider, now).await {
            return cached;
        }

        self.monitoring.miss(key);
        self.coalesced_update(key, provider, now).await
    }

    /// Like [`get_or_provide`](Self::get_or_provide), but a miss returns
    /// `default` at once while the update runs detached
    pub async fn get_or_provide_async(
        &self,
        key: &K,
        provider: SharedProvider<K, V>,
        default: V,
    ) -> Fetched<V> {
        let now = self.clock.now();
        if let Some(cached) = self.serve_cached(key, &provider, now).await {
            return cached;
        }

        self.monitoring.miss(key);
        self.spawn_update(key, &provider, now);
        Fetched::Default(default)
    }

    /// Read without providing; `None` unless a usable entry exists
    pub async fn get(&self, key: &K) -> Option<Fetched<V>> {
        let now = self.clock.now();
        let item = self.lookup(key).await?;
        match item.freshness(now) {
            Freshness::Expired => None,
            _ => Some(item.fetched(now)),
        }
    }

    /// Delete the entry for `key`
    pub async fn remove(&self, key: &K) -> Result<()> {
        if let Err(err) = self.store.remove(key).await {
            self.monitoring.remove_failed(key, &err);
        }
        Ok(())
    }

    /// Discard every entry
    pub async fn clear(&self) -> Result<()> {
        if let Err(err) = self.store.clear().await {
            self.monitoring.clear_failed(&err);
        }
        Ok(())
    }
}

#[async_trait]
impl<K, V, S, M> Cacher<K, V> for Cache<K, V, S, M>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Store<K, CacheItem<V>>,
    M: CacheMonitoring,
{
    async fn get_or_provide(&self, key: &K, provider: SharedProvider<K, V>) -> Fetched<V> {
        Cache::get_or_provide(self, key, provider).await
    }

    async fn get_or_provide_async(
        &self,
        key: &K,
        provider: SharedProvider<K, V>,
        default: V,
    ) -> Fetched<V> {
        Cache::get_or_provide_async(self, key, provider, default).await
    }

    async fn get(&self, key: &K) -> Option<Fetched<V>> {
        Cache::get(self, key).await
    }

    async fn remove(&self, key: &K) -> Result<()> {
        Cache::remove(self, key).await
    }

    async fn clear(&self) -> Result<()> {
        Cache::clear(self).await
    }
}
