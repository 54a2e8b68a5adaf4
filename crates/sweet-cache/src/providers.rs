//! Helpers for building value providers

use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sweet_cache_core::{CacheError, Cacher, Provided, SharedProvider, Ttls, ValueProvider};

use crate::RemoteCacheProvider;

/// Fixed TTLs for successful and failed provider calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TtlPolicy {
    /// Fresh window of a value
    pub actual: Duration,
    /// Usable life of a value
    pub usable: Duration,
    /// Fresh window of a cached failure
    pub negative_actual: Duration,
    /// Usable life of a cached failure
    pub negative_usable: Duration,
}

impl TtlPolicy {
    pub fn new(
        actual: Duration,
        usable: Duration,
        negative_actual: Duration,
        negative_usable: Duration,
    ) -> Self {
        Self {
            actual,
            usable,
            negative_actual,
            negative_usable,
        }
    }

    /// Fresh for the first half of each usable window
    pub fn halved(usable: Duration, negative_usable: Duration) -> Self {
        Self {
            actual: usable / 2,
            usable,
            negative_actual: negative_usable / 2,
            negative_usable,
        }
    }

    pub fn with_actual(mut self, actual: Duration) -> Self {
        self.actual = actual;
        self
    }

    pub fn with_usable(mut self, usable: Duration) -> Self {
        self.usable = usable;
        self
    }

    pub fn with_negative_actual(mut self, negative_actual: Duration) -> Self {
        self.negative_actual = negative_actual;
        self
    }

    pub fn with_negative_usable(mut self, negative_usable: Duration) -> Self {
        self.negative_usable = negative_usable;
        self
    }

    /// TTLs for a successful value
    pub fn positive(&self) -> Ttls {
        Ttls::new(self.actual, self.usable)
    }

    /// TTLs for a failure
    pub fn negative(&self) -> Ttls {
        Ttls::new(self.negative_actual, self.negative_usable)
    }
}

/// Provider built from a fallible async function and a [`TtlPolicy`]
///
/// The function's error is rendered into [`CacheError::Provider`] and
/// cached with the negative TTLs.
pub struct FixedTtlProvider<F> {
    policy: TtlPolicy,
    f: F,
}

impl<F> FixedTtlProvider<F> {
    pub fn new(policy: TtlPolicy, f: F) -> Self {
        Self { policy, f }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }
}

#[async_trait]
impl<K, V, E, F, Fut> ValueProvider<K, V> for FixedTtlProvider<F>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    E: Display,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<V, E>> + Send,
{
    async fn provide(&self, key: &K) -> Provided<V> {
        match (self.f)(key.clone()).await {
            Ok(value) => Provided::ok(value, self.policy.positive()),
            Err(err) => Provided::failed(CacheError::provider(err), self.policy.negative()),
        }
    }
}

/// Shared [`FixedTtlProvider`]
pub fn fixed_ttl<K, V, E, F, Fut>(policy: TtlPolicy, f: F) -> SharedProvider<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    E: Display + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
{
    Arc::new(FixedTtlProvider::new(policy, f))
}

/// [`fixed_ttl`] with values fresh for half of `usable` and failures fresh
/// for half of `negative_usable`
pub fn simple_fixed_ttl<K, V, E, F, Fut>(
    usable: Duration,
    negative_usable: Duration,
    f: F,
) -> SharedProvider<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    E: Display + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
{
    fixed_ttl(TtlPolicy::halved(usable, negative_usable), f)
}

/// Provider from an async function returning [`Provided`] directly
pub struct FnProvider<F> {
    f: F,
}

#[async_trait]
impl<K, V, F, Fut> ValueProvider<K, V> for FnProvider<F>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Provided<V>> + Send,
{
    async fn provide(&self, key: &K) -> Provided<V> {
        (self.f)(key.clone()).await
    }
}

/// Shared [`FnProvider`]
pub fn provider_fn<K, V, F, Fut>(f: F) -> SharedProvider<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Provided<V>> + Send + 'static,
{
    Arc::new(FnProvider { f })
}

/// Provider asking `remote` first and `base` only on a remote miss
pub fn with_remote_cache<K, V, C>(
    remote: Arc<C>,
    base: SharedProvider<K, V>,
) -> RemoteCacheProvider<K, V>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
    C: Cacher<K, V>,
{
    RemoteCacheProvider::new(remote, base)
}
