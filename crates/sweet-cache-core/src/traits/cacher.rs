//! Cache contract shared by every tier

use async_trait::async_trait;

use crate::{Fetched, Result, SharedProvider};

/// A cache in front of a value provider
///
/// Implemented by the single-tier cache, the two-level composition, the
/// namespacing wrapper and remote adapters, so tiers nest freely.
#[async_trait]
pub trait Cacher<K, V>: Send + Sync + 'static
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    /// Return the cached outcome for `key`, calling `provider` on a miss
    ///
    /// Fresh entries are returned as-is. Stale entries are returned while a
    /// refresh runs in the background. Missing or expired entries are
    /// produced by a single coalesced provider call.
    async fn get_or_provide(&self, key: &K, provider: SharedProvider<K, V>) -> Fetched<V>;

    /// Like [`get_or_provide`](Cacher::get_or_provide) but never waits for
    /// the provider
    ///
    /// On a miss the update is started in the background and
    /// `Fetched::Default(default)` is returned.
    async fn get_or_provide_async(
        &self,
        key: &K,
        provider: SharedProvider<K, V>,
        default: V,
    ) -> Fetched<V>;

    /// Read without providing; `None` when nothing usable is cached
    async fn get(&self, key: &K) -> Option<Fetched<V>>;

    /// Delete `key`
    async fn remove(&self, key: &K) -> Result<()>;

    /// Discard every entry
    async fn clear(&self) -> Result<()>;
}
