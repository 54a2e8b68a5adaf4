//! Local memory tier in front of Redis
//!
//! Run with `cargo run --example redis_two_level --features redis` against a
//! Redis at `REDIS_URL` (default `redis://127.0.0.1:6379`). Without a server
//! the Redis tier degrades to misses and the provider answers every call.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sweet_cache::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Product {
    sku: String,
    price_cents: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    let config = RedisConfig::new(url)
        .prefix("shop")
        .pool_size(4)
        .ttl_jitter(Duration::from_millis(250));

    let remote: RedisCache<Product> = RedisCache::connect_lazy(config)?;
    let local: Cache<String, Product, _> =
        Cache::new(MemoryStore::new(MemoryConfig::with_capacity(10_000)));

    let catalog = NamespacedCache::new("v1", "products", ":", TwoLevelCache::new(local, remote));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let provider = simple_fixed_ttl(
        Duration::from_secs(60),
        Duration::from_secs(10),
        move |sku: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(Product {
                    price_cents: 100 * sku.len() as u64,
                    sku,
                })
            }
        },
    );

    for round in 1..=3 {
        let product = catalog
            .get_or_provide(&"sku-123".to_string(), provider.clone())
            .await
            .into_result()?;
        println!("round {round}: {product:?}");
    }

    println!("Provider calls: {}", calls.load(Ordering::SeqCst));
    Ok(())
}
