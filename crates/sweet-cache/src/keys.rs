//! Global key namespacing

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use sweet_cache_core::{CacheKey, Cacher, Fetched, Provided, Result, SharedProvider, ValueProvider};

/// `namespace ⧺ separator ⧺ cache_name ⧺ separator`, prepended to raw keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix {
    prefix: String,
}

impl KeyPrefix {
    pub const DEFAULT_SEPARATOR: &'static str = ":";

    pub fn new(namespace: &str, cache_name: &str, separator: &str) -> Self {
        Self {
            prefix: format!("{namespace}{separator}{cache_name}{separator}"),
        }
    }

    /// Use a precomputed prefix as-is
    pub fn from_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// The global key for `key`; the raw key is appended verbatim
    pub fn derive<K: CacheKey + ?Sized>(&self, key: &K) -> String {
        format!("{}{}", self.prefix, key.cache_key())
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// Calls the caller's provider with the caller's key, whatever string key
/// the inner tier passes
struct KeyedProvider<K, V> {
    key: K,
    inner: SharedProvider<K, V>,
}

#[async_trait]
impl<K, V> ValueProvider<String, V> for KeyedProvider<K, V>
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    async fn provide(&self, _global_key: &String) -> Provided<V> {
        self.inner.provide(&self.key).await
    }
}

/// Cache wrapper that rewrites every key into a global string key
///
/// Lets several logical caches share one string-keyed tier (typically a
/// remote one) without collisions. Providers still receive the caller's
/// original key. `clear` is forwarded unchanged and so clears the whole
/// inner tier.
#[derive(Debug, Clone)]
pub struct NamespacedCache<C> {
    inner: C,
    prefix: KeyPrefix,
}

impl<C> NamespacedCache<C> {
    pub fn new(namespace: &str, cache_name: &str, separator: &str, inner: C) -> Self {
        Self::with_prefix(KeyPrefix::new(namespace, cache_name, separator), inner)
    }

    pub fn with_prefix(prefix: KeyPrefix, inner: C) -> Self {
        Self { inner, prefix }
    }

    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C> NamespacedCache<C> {
    fn keyed<K, V>(key: &K, provider: SharedProvider<K, V>) -> SharedProvider<String, V>
    where
        K: Clone + Send + Sync + 'static,
        V: Send + 'static,
    {
        Arc::new(KeyedProvider {
            key: key.clone(),
            inner: provider,
        })
    }
}

#[async_trait]
impl<K, V, C> Cacher<K, V> for NamespacedCache<C>
where
    K: CacheKey + Clone + Send + Sync + 'static,
    V: Send + 'static,
    C: Cacher<String, V>,
{
    async fn get_or_provide(&self, key: &K, provider: SharedProvider<K, V>) -> Fetched<V> {
        let global = self.prefix.derive(key);
        self.inner.get_or_provide(&global, Self::keyed(key, provider)).await
    }

    async fn get_or_provide_async(
        &self,
        key: &K,
        provider: SharedProvider<K, V>,
        default: V,
    ) -> Fetched<V> {
        let global = self.prefix.derive(key);
        self.inner
            .get_or_provide_async(&global, Self::keyed(key, provider), default)
            .await
    }

    async fn get(&self, key: &K) -> Option<Fetched<V>> {
        self.inner.get(&self.prefix.derive(key)).await
    }

    async fn remove(&self, key: &K) -> Result<()> {
        self.inner.remove(&self.prefix.derive(key)).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}
