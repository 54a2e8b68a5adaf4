//! Two-Level Cache Example
//!
//! A small local tier in front of a shared tier. Two logical caches share
//! the back tier under different namespaces.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sweet_cache::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Stands in for a remote store shared by many processes
    let shared: Cache<String, String, _> = Cache::new(MemoryStore::with_defaults());

    let local_users: Cache<String, String, _> =
        Cache::new(MemoryStore::new(MemoryConfig::with_capacity(100)));
    let users = TwoLevelCache::new(
        local_users,
        NamespacedCache::new("shop", "users", KeyPrefix::DEFAULT_SEPARATOR, shared.clone()),
    );

    let local_orders: Cache<String, String, _> =
        Cache::new(MemoryStore::new(MemoryConfig::with_capacity(100)));
    let orders = TwoLevelCache::new(
        local_orders,
        NamespacedCache::new("shop", "orders", KeyPrefix::DEFAULT_SEPARATOR, shared.clone()),
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let provider = |kind: &'static str, calls: Arc<AtomicUsize>| {
        simple_fixed_ttl(
            Duration::from_secs(30),
            Duration::from_secs(5),
            move |id: String| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(format!("{kind} #{id}"))
                }
            },
        )
    };
    let user_provider = provider("user", calls.clone());
    let order_provider = provider("order", calls.clone());

    let user = users.get_or_provide(&"7".to_string(), user_provider.clone()).await;
    let order = orders.get_or_provide(&"7".to_string(), order_provider.clone()).await;
    println!("user:  {:?}", user.value());
    println!("order: {:?}", order.value());

    // Same key, different namespaces
    for key in ["shop:users:7", "shop:orders:7"] {
        println!("shared[{key}] = {:?}", shared.get(&key.to_string()).await.and_then(Fetched::ok));
    }

    // Served by the local tier now
    users.get_or_provide(&"7".to_string(), user_provider).await;
    println!("Provider calls: {}", calls.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}
