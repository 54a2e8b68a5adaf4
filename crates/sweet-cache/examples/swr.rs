//! Refresh-Ahead Example
//!
//! Entries are fresh for their actual TTL, then served stale while a
//! background refresh replaces them, and recomputed inline once the usable
//! TTL has passed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sweet_cache::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cache: Cache<String, String, _> = Cache::new(MemoryStore::with_defaults());

    let version = Arc::new(AtomicUsize::new(0));
    let counter = version.clone();
    let provider = fixed_ttl(
        TtlPolicy::new(
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_millis(500),
            Duration::from_secs(1),
        ),
        move |name: String| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, CacheError>(format!("{name} v{n}"))
            }
        },
    );
    let key = "dashboard".to_string();

    println!("=== Refresh-Ahead Demo ===\n");
    report("T+0.0s", cache.get_or_provide(&key, provider.clone()).await);
    report("T+0.5s (fresh)", {
        tokio::time::sleep(Duration::from_millis(500)).await;
        cache.get_or_provide(&key, provider.clone()).await
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    report("T+1.5s (stale)", cache.get_or_provide(&key, provider.clone()).await);

    cache.wait_for_refreshes().await;
    report("after refresh", cache.get_or_provide(&key, provider.clone()).await);

    tokio::time::sleep(Duration::from_secs(4)).await;
    report("T+6s (expired)", cache.get_or_provide(&key, provider.clone()).await);

    println!("\nProvider calls: {}", version.load(Ordering::SeqCst));
    Ok(())
}

fn report(label: &str, fetched: Fetched<String>) {
    match fetched {
        Fetched::Value(value, ttl) => println!("{label}: {value} (remaining {ttl:?})"),
        Fetched::Failed(err, _) => println!("{label}: failed: {err}"),
        Fetched::Default(value) => println!("{label}: default {value}"),
    }
}
