use std::time::Duration;
use sweet_cache::prelude::*;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let monitoring = TracingMonitoring::new().with_service_name("example-service");
    let cache: Cache<String, String, _, _> = Cache::with_monitoring(
        MemoryStore::with_defaults(),
        monitoring,
        CacheConfig::default().refresh_timeout(Duration::from_secs(2)),
    );

    let provider = simple_fixed_ttl(
        Duration::from_millis(400),
        Duration::from_millis(200),
        |key: String| async move {
            if key.starts_with("missing") {
                Err(CacheError::Provider(format!("{key} not found")))
            } else {
                Ok(format!("value of {key}"))
            }
        },
    );

    println!("\n-- miss, then hit");
    cache.get_or_provide(&"user:1".to_string(), provider.clone()).await;
    cache.get_or_provide(&"user:1".to_string(), provider.clone()).await;

    println!("\n-- stale hit with background refresh");
    tokio::time::sleep(Duration::from_millis(250)).await;
    cache.get_or_provide(&"user:1".to_string(), provider.clone()).await;
    cache.wait_for_refreshes().await;

    println!("\n-- negative caching");
    cache.get_or_provide(&"missing:9".to_string(), provider.clone()).await;
    cache.get_or_provide(&"missing:9".to_string(), provider).await;

    println!("\nCheck the console output for structured events");
    Ok(())
}
