//! Backing store contract

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Key/value storage engine behind a single cache tier
///
/// Implementations own eviction and physical expiry. A store may drop any
/// entry at any time; an absent entry is a miss, never an error.
#[async_trait]
pub trait Store<K, V>: Send + Sync + 'static
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Get a value
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &K) -> Result<Option<V>>;

    /// Set a value that never expires physically
    ///
    /// Returns `false` if the store declined the write.
    async fn set(&self, key: K, value: V) -> Result<bool>;

    /// Set a value the store may discard after `ttl`
    ///
    /// A zero `ttl` means no expiry.
    async fn set_with_ttl(&self, key: K, value: V, ttl: Duration) -> Result<bool>;

    /// Delete a key; deleting an absent key succeeds
    async fn remove(&self, key: &K) -> Result<()>;

    /// Discard every entry
    async fn clear(&self) -> Result<()>;
}
