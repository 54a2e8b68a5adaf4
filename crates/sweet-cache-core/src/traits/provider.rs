//! Value provider contract

use std::sync::Arc;

use async_trait::async_trait;

use crate::Provided;

/// The expensive operation a cache sits in front of
///
/// A failure is reported inside [`Provided`] together with the TTLs the
/// failure should be cached for. Dropping the returned future cancels the
/// call.
#[async_trait]
pub trait ValueProvider<K, V>: Send + Sync + 'static {
    /// Produce the value for `key`
    async fn provide(&self, key: &K) -> Provided<V>;
}

/// Provider handle shared between callers and detached refresh tasks
pub type SharedProvider<K, V> = Arc<dyn ValueProvider<K, V>>;
