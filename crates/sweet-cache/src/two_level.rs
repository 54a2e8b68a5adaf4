//! Local tier in front of a remote tier

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use sweet_cache_core::{
    CacheError, Cacher, Fetched, Provided, Result, SharedProvider, Ttls, ValueProvider,
};

/// Provider that asks a remote cache first and the base provider only on a
/// remote miss
///
/// The TTLs handed to the local tier come from the true source: the base
/// provider's TTLs when it ran during this call, else the lifetime the
/// remote tier reports for a fresh entry, else `remote_hit_ttl` (zero by
/// default, meaning the value is returned but not kept locally). A stale
/// remote entry counts as unreported, so the local tier never holds a copy
/// that is stale from the start.
pub struct RemoteCacheProvider<K, V> {
    remote: Arc<dyn Cacher<K, V>>,
    base: SharedProvider<K, V>,
    remote_hit_ttl: Ttls,
}

impl<K, V> RemoteCacheProvider<K, V> {
    pub fn new(remote: Arc<dyn Cacher<K, V>>, base: SharedProvider<K, V>) -> Self {
        Self {
            remote,
            base,
            remote_hit_ttl: Ttls::ZERO,
        }
    }

    /// TTLs for remote hits whose lifetime the remote tier can't report
    pub fn with_remote_hit_ttl(mut self, ttl: Ttls) -> Self {
        self.remote_hit_ttl = ttl;
        self
    }
}

/// Forwards to the base provider and remembers the TTLs it returned
struct CapturingProvider<K, V> {
    inner: SharedProvider<K, V>,
    ttl: Mutex<Option<Ttls>>,
}

#[async_trait]
impl<K, V> ValueProvider<K, V> for CapturingProvider<K, V>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    async fn provide(&self, key: &K) -> Provided<V> {
        let provided = self.inner.provide(key).await;
        *self.ttl.lock() = Some(provided.ttl.normalized());
        provided
    }
}

#[async_trait]
impl<K, V> ValueProvider<K, V> for RemoteCacheProvider<K, V>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    async fn provide(&self, key: &K) -> Provided<V> {
        let capture = Arc::new(CapturingProvider {
            inner: Arc::clone(&self.base),
            ttl: Mutex::new(None),
        });

        let fetched = self.remote.get_or_provide(key, capture.clone()).await;
        let captured = capture.ttl.lock().take();
        let reported = fetched.ttl().filter(|ttl| !ttl.actual.is_zero());
        let ttl = captured.or(reported).unwrap_or(self.remote_hit_ttl);

        match fetched {
            Fetched::Value(value, _) => Provided::ok(value, ttl),
            Fetched::Failed(err, _) => Provided::failed(err, ttl),
            Fetched::Default(_) => Provided::failed(CacheError::NotReady, Ttls::ZERO),
        }
    }
}

/// Two cache tiers composed into one
///
/// A front miss cascades into the back tier, and only a back miss reaches
/// the provider, so both tiers keep coalescing per key.
pub struct TwoLevelCache<F, B> {
    front: F,
    back: Arc<B>,
}

impl<F: Clone, B> Clone for TwoLevelCache<F, B> {
    fn clone(&self) -> Self {
        Self {
            front: self.front.clone(),
            back: Arc::clone(&self.back),
        }
    }
}

impl<F, B> TwoLevelCache<F, B> {
    pub fn new(front: F, back: B) -> Self {
        Self::from_shared(front, Arc::new(back))
    }

    /// Compose with a back tier that is also used elsewhere
    pub fn from_shared(front: F, back: Arc<B>) -> Self {
        Self { front, back }
    }

    pub fn front(&self) -> &F {
        &self.front
    }

    pub fn back(&self) -> &Arc<B> {
        &self.back
    }
}

impl<F, B> TwoLevelCache<F, B> {
    fn cascade<K, V>(&self, provider: SharedProvider<K, V>) -> SharedProvider<K, V>
    where
        K: Send + Sync + 'static,
        V: Send + 'static,
        B: Cacher<K, V>,
    {
        let back: Arc<dyn Cacher<K, V>> = self.back.clone();
        Arc::new(RemoteCacheProvider::new(back, provider))
    }
}

#[async_trait]
impl<K, V, F, B> Cacher<K, V> for TwoLevelCache<F, B>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
    F: Cacher<K, V>,
    B: Cacher<K, V>,
{
    async fn get_or_provide(&self, key: &K, provider: SharedProvider<K, V>) -> Fetched<V> {
        self.front.get_or_provide(key, self.cascade(provider)).await
    }

    async fn get_or_provide_async(
        &self,
        key: &K,
        provider: SharedProvider<K, V>,
        default: V,
    ) -> Fetched<V> {
        self.front
            .get_or_provide_async(key, self.cascade(provider), default)
            .await
    }

    async fn get(&self, key: &K) -> Option<Fetched<V>> {
        let front = self.front.get(key).await;
        if front.as_ref().is_some_and(Fetched::is_ok) {
            return front;
        }
        match self.back.get(key).await {
            Some(back) if back.is_ok() => Some(back),
            back => front.or(back),
        }
    }

    async fn remove(&self, key: &K) -> Result<()> {
        let front = self.front.remove(key).await;
        let back = self.back.remove(key).await;
        front.and(back)
    }

    async fn clear(&self) -> Result<()> {
        let front = self.front.clear().await;
        let back = self.back.clear().await;
        front.and(back)
    }
}
