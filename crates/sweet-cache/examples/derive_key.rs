use std::time::Duration;
use sweet_cache::prelude::*;

#[derive(Debug, Clone, CacheKey)]
#[cache_key(prefix = "user")]
struct UserKey {
    tenant_id: u64,
    user_id: u64,
}

#[derive(Debug, Clone, CacheKey)]
#[cache_key(separator = "/")]
struct PathKey {
    folder: String,
    file: String,
    #[cache_key(skip)]
    _etag: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let key = UserKey {
        tenant_id: 100,
        user_id: 456,
    };
    println!("UserKey: {}", key.cache_key());
    assert_eq!(key.cache_key(), "user:100:456");

    let path = PathKey {
        folder: "docs".to_string(),
        file: "report.pdf".to_string(),
        _etag: "hidden".to_string(),
    };
    println!("PathKey: {}", path.cache_key());
    assert_eq!(path.cache_key(), "docs/report.pdf");

    // Derived keys plug straight into a namespaced cache
    let shared: Cache<String, String, _> = Cache::new(MemoryStore::with_defaults());
    let users = NamespacedCache::new("crm", "profiles", ":", shared.clone());
    let provider = simple_fixed_ttl(
        Duration::from_secs(60),
        Duration::from_secs(5),
        |key: UserKey| async move {
            Ok::<_, CacheError>(format!("profile {} of tenant {}", key.user_id, key.tenant_id))
        },
    );

    let profile = users.get_or_provide(&key, provider).await.into_result()?;
    println!("Profile: {profile}");
    assert!(shared.get(&"crm:profiles:user:100:456".to_string()).await.is_some());

    Ok(())
}
