//! Basic Memory Cache Example
//!
//! Values come from a provider the first time a key is requested and from
//! the in-memory store afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sweet_cache::prelude::*;

#[derive(Debug, Clone)]
struct User {
    id: u64,
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let store = MemoryStore::new(MemoryConfig::with_capacity(1_000));
    let cache: Cache<u64, User, _> = Cache::new(store);

    let lookups = Arc::new(AtomicUsize::new(0));
    let counter = lookups.clone();
    let provider = simple_fixed_ttl(
        Duration::from_secs(60),
        Duration::from_secs(5),
        move |id: u64| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if id == 0 {
                    return Err(CacheError::InvalidKey("user ids start at 1".into()));
                }
                Ok(User {
                    id,
                    name: format!("user-{id}"),
                })
            }
        },
    );

    let user = cache.get_or_provide(&42, provider.clone()).await.into_result()?;
    println!("First read:  {user:?}");

    let again = cache.get_or_provide(&42, provider.clone()).await;
    println!("Second read: {:?} (remaining {:?})", again.value(), again.ttl());

    // Failures are cached too, with the negative TTLs
    for _ in 0..3 {
        if let Fetched::Failed(err, _) = cache.get_or_provide(&0, provider.clone()).await {
            println!("Lookup of 0 failed: {err}");
        }
    }

    println!("Provider calls: {}", lookups.load(Ordering::SeqCst));
    assert_eq!(lookups.load(Ordering::SeqCst), 2);

    cache.remove(&42).await?;
    println!("After remove: {:?}", cache.get(&42).await);

    Ok(())
}
