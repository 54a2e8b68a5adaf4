//! Request Coalescing Example
//!
//! Concurrent misses for one key share a single provider call.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use sweet_cache::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cache: Cache<String, String, _> = Cache::new(MemoryStore::with_defaults());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let provider = simple_fixed_ttl(
        Duration::from_secs(60),
        Duration::from_secs(5),
        move |key: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok::<_, CacheError>(format!("expensive report for {key}"))
            }
        },
    );

    println!("Spawning 100 concurrent requests for one key...");
    let start = Instant::now();

    let mut handles = Vec::with_capacity(100);
    for _ in 0..100 {
        let cache = cache.clone();
        let provider = provider.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_provide(&"report:q3".to_string(), provider)
                .await
                .into_result()
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await.map_err(|e| CacheError::Internal(e.to_string()))? {
            println!("request failed: {err}");
        }
    }

    println!("Elapsed: {:?}", start.elapsed());
    println!("Provider calls: {}", calls.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    Ok(())
}
