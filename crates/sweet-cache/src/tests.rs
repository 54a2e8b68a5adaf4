//! Integration tests for Cache, TwoLevelCache and NamespacedCache

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{CacheItem, ManualClock};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    /// Provider returning `<key>-<call number>` and counting its calls
    struct Counting {
        calls: AtomicUsize,
        ttl: Ttls,
        fail: bool,
        delay: Duration,
    }

    impl Counting {
        fn new(ttl: Ttls) -> Arc<Self> {
            Self::build(ttl, false, Duration::ZERO)
        }

        fn failing(ttl: Ttls) -> Arc<Self> {
            Self::build(ttl, true, Duration::ZERO)
        }

        fn slow(ttl: Ttls, delay: Duration) -> Arc<Self> {
            Self::build(ttl, false, delay)
        }

        fn build(ttl: Ttls, fail: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                ttl,
                fail,
                delay,
            })
        }

        fn shared(self: &Arc<Self>) -> SharedProvider<String, String> {
            Arc::clone(self) as SharedProvider<String, String>
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValueProvider<String, String> for Counting {
        async fn provide(&self, key: &String) -> Provided<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                Provided::failed(CacheError::provider(format!("{key} unavailable")), self.ttl)
            } else {
                Provided::ok(format!("{key}-{n}"), self.ttl)
            }
        }
    }

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl<K, V> Store<K, V> for BrokenStore
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        async fn get(&self, _key: &K) -> Result<Option<V>> {
            Err(CacheError::Backend("disk on fire".into()))
        }

        async fn set(&self, _key: K, _value: V) -> Result<bool> {
            Err(CacheError::Backend("disk on fire".into()))
        }

        async fn set_with_ttl(&self, _key: K, _value: V, _ttl: Duration) -> Result<bool> {
            Err(CacheError::Backend("disk on fire".into()))
        }

        async fn remove(&self, _key: &K) -> Result<()> {
            Err(CacheError::Backend("disk on fire".into()))
        }

        async fn clear(&self) -> Result<()> {
            Err(CacheError::Backend("disk on fire".into()))
        }
    }

    /// Store that accepts nothing
    struct FullStore;

    #[async_trait]
    impl<K, V> Store<K, V> for FullStore
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        async fn get(&self, _key: &K) -> Result<Option<V>> {
            Ok(None)
        }

        async fn set(&self, _key: K, _value: V) -> Result<bool> {
            Ok(false)
        }

        async fn set_with_ttl(&self, _key: K, _value: V, _ttl: Duration) -> Result<bool> {
            Ok(false)
        }

        async fn remove(&self, _key: &K) -> Result<()> {
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    type MemCache = Cache<String, String, MemoryStore<String, CacheItem<String>>>;

    fn memory_cache(clock: &ManualClock) -> MemCache {
        let store = MemoryStore::with_clock(MemoryConfig::default(), Arc::new(clock.clone()));
        Cache::with_config(store, CacheConfig::default().with_clock(clock.clone()))
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[tokio::test]
    async fn test_fresh_entry_served_without_provider() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let first = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(first.value().map(String::as_str), Some("a-1"));

        clock.advance(secs(5));
        let second = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(second, Fetched::Value("a-1".into(), Some(Ttls::new(secs(5), secs(15)))));
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.pending_refreshes(), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_refreshed_once_in_background() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        clock.advance(secs(12));

        for _ in 0..10 {
            let stale = cache.get_or_provide(&key("a"), provider.shared()).await;
            assert_eq!(stale.value().map(String::as_str), Some("a-1"));
        }
        // the first stale read claimed the key before its task ever ran
        assert_eq!(cache.pending_refreshes(), 1);
        cache.wait_for_refreshes().await;
        assert_eq!(provider.calls(), 2);

        let refreshed = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(
            refreshed,
            Fetched::Value("a-2".into(), Some(Ttls::new(secs(10), secs(20))))
        );
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputed_inline() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        clock.advance(secs(20));

        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(fetched.value().map(String::as_str), Some("a-2"));
        assert_eq!(cache.pending_refreshes(), 0);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_ahead_timeline() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let version = Arc::new(AtomicUsize::new(0));
        let counter = version.clone();
        let provider = simple_fixed_ttl(secs(20), secs(5), move |_key: String| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(if n == 0 { "A" } else { "B" }.to_string())
            }
        });
        let k = key("item");

        assert_eq!(cache.get_or_provide(&k, provider.clone()).await.ok(), Some("A".into()));

        clock.set_elapsed(secs(5));
        assert_eq!(cache.get_or_provide(&k, provider.clone()).await.ok(), Some("A".into()));
        assert_eq!(version.load(Ordering::SeqCst), 1);

        clock.set_elapsed(secs(12));
        assert_eq!(cache.get_or_provide(&k, provider.clone()).await.ok(), Some("A".into()));
        cache.wait_for_refreshes().await;
        assert_eq!(version.load(Ordering::SeqCst), 2);

        clock.set_elapsed(secs(13));
        assert_eq!(cache.get_or_provide(&k, provider.clone()).await.ok(), Some("B".into()));
        assert_eq!(version.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_without_refresh_recomputes() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::halved(secs(20)));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        clock.set_elapsed(secs(21));

        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(fetched.ok(), Some("a-2".into()));
        assert_eq!(cache.pending_refreshes(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_coalesce() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::slow(Ttls::new(secs(10), secs(20)), Duration::from_millis(100));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let cache = cache.clone();
            let provider = provider.shared();
            handles.push(tokio::spawn(async move {
                cache.get_or_provide(&key("hot"), provider).await
            }));
        }

        for handle in handles {
            let fetched = handle.await.unwrap();
            assert_eq!(fetched.ok(), Some("hot-1".into()));
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_keys_do_not_coalesce() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::slow(Ttls::new(secs(10), secs(20)), Duration::from_millis(50));

        let (ka, kb) = (key("a"), key("b"));
        let (a, b) = tokio::join!(
            cache.get_or_provide(&ka, provider.shared()),
            cache.get_or_provide(&kb, provider.shared()),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_wedge_key() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let slow = Counting::slow(Ttls::new(secs(10), secs(20)), secs(60));

        let leader = {
            let cache = cache.clone();
            let slow = slow.shared();
            tokio::spawn(async move { cache.get_or_provide(&key("a"), slow).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();
        let _ = leader.await;

        let provider = Counting::new(Ttls::new(secs(10), secs(20)));
        let fetched = tokio::time::timeout(
            secs(5),
            cache.get_or_provide(&key("a"), provider.shared()),
        )
        .await
        .expect("key stayed in flight after its leader was cancelled");

        assert_eq!(fetched.ok(), Some("a-1".into()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failures_cached_with_negative_ttl() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::failing(Ttls::new(secs(1), secs(2)));

        let first = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(
            first.error(),
            Some(&CacheError::Provider("a unavailable".into()))
        );

        clock.advance(Duration::from_millis(500));
        let cached = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert!(matches!(cached, Fetched::Failed(CacheError::Provider(_), Some(_))));
        assert_eq!(provider.calls(), 1);

        clock.advance(secs(2));
        cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_usable_ttl_is_not_stored() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::ZERO);

        let first = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(first.ok(), Some("a-1".into()));
        assert!(cache.store().is_empty());
        assert_eq!(cache.get(&key("a")).await, None);

        let second = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(second.ok(), Some("a-2".into()));
    }

    #[tokio::test]
    async fn test_actual_ttl_clamped_to_usable() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(secs(30), secs(10)));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        clock.advance(secs(10));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.pending_refreshes(), 0);
    }

    #[tokio::test]
    async fn test_async_miss_returns_default() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let fetched = cache
            .get_or_provide_async(&key("a"), provider.shared(), "loading".into())
            .await;
        assert_eq!(fetched, Fetched::Default("loading".into()));
        assert_eq!(fetched.clone().into_result(), Err(CacheError::NotReady));

        cache.wait_for_refreshes().await;
        assert_eq!(provider.calls(), 1);

        let cached = cache
            .get_or_provide_async(&key("a"), provider.shared(), "loading".into())
            .await;
        assert_eq!(cached.ok(), Some("a-1".into()));
    }

    #[tokio::test]
    async fn test_get_never_provides() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        assert_eq!(cache.get(&key("a")).await, None);

        cache.get_or_provide(&key("a"), provider.shared()).await;
        clock.advance(secs(15));

        let stale = cache.get(&key("a")).await;
        assert_eq!(stale, Some(Fetched::Value("a-1".into(), Some(Ttls::new(secs(0), secs(5))))));
        assert_eq!(cache.pending_refreshes(), 0);

        clock.advance(secs(5));
        assert_eq!(cache.get(&key("a")).await, None);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        for k in ["a", "b", "c"] {
            cache.get_or_provide(&key(k), provider.shared()).await;
        }

        cache.remove(&key("a")).await.unwrap();
        assert_eq!(cache.get(&key("a")).await, None);
        assert!(cache.get(&key("b")).await.is_some());

        cache.clear().await.unwrap();
        assert!(cache.store().is_empty());

        cache.get_or_provide(&key("b"), provider.shared()).await;
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_stats_monitoring_counts_outcomes() {
        let clock = ManualClock::new();
        let stats = StatsMonitoring::new();
        let store = MemoryStore::with_clock(MemoryConfig::default(), Arc::new(clock.clone()));
        let cache: MemCacheWith<StatsMonitoring> = Cache::with_monitoring(
            store,
            stats.clone(),
            CacheConfig::default().with_clock(clock.clone()),
        );
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        cache.get_or_provide(&key("a"), provider.shared()).await;
        clock.advance(secs(15));
        cache.get_or_provide(&key("a"), provider.shared()).await;
        cache.wait_for_refreshes().await;

        let snapshot = stats.stats();
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.stale_hits, 1);
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.total_requests(), 3);
    }

    type MemCacheWith<M> = Cache<String, String, MemoryStore<String, CacheItem<String>>, M>;

    #[tokio::test]
    async fn test_store_failures_reported_and_bypassed() {
        let stats = StatsMonitoring::new();
        let cache: Cache<String, String, BrokenStore, StatsMonitoring> =
            Cache::with_monitoring(BrokenStore, stats.clone(), CacheConfig::default());
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(fetched.ok(), Some("a-1".into()));
        // the lookup and the update's re-check both fail, then the write
        assert_eq!(stats.stats().failures, 3);

        let again = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(again.ok(), Some("a-2".into()));

        assert!(cache.remove(&key("a")).await.is_ok());
        assert!(cache.clear().await.is_ok());
        assert_eq!(stats.stats().failures, 8);
    }

    #[tokio::test]
    async fn test_rejected_write_reported() {
        let stats = StatsMonitoring::new();
        let cache: Cache<String, String, FullStore, StatsMonitoring> =
            Cache::with_monitoring(FullStore, stats.clone(), CacheConfig::default());
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert!(fetched.is_ok());
        assert_eq!(stats.stats().failures, 1);
        assert_eq!(stats.stats().misses, 1);
    }

    fn two_level(
        clock: &ManualClock,
    ) -> (TwoLevelCache<MemCache, MemCache>, MemCache, Arc<MemCache>) {
        let front = memory_cache(clock);
        let back = Arc::new(memory_cache(clock));
        let cache = TwoLevelCache::from_shared(front.clone(), Arc::clone(&back));
        (cache, front, back)
    }

    #[tokio::test]
    async fn test_two_level_back_hit_skips_provider() {
        let clock = ManualClock::new();
        let (cache, front, back) = two_level(&clock);
        let seed = Counting::new(Ttls::new(secs(10), secs(20)));
        back.get_or_provide(&key("a"), seed.shared()).await;

        clock.advance(secs(4));
        let provider = Counting::new(Ttls::new(secs(60), secs(120)));
        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;

        assert_eq!(fetched.ok(), Some("a-1".into()));
        assert_eq!(provider.calls(), 0);
        // the local copy inherits the remote entry's remaining lifetime
        assert_eq!(
            front.get(&key("a")).await,
            Some(Fetched::Value("a-1".into(), Some(Ttls::new(secs(6), secs(16)))))
        );
    }

    #[tokio::test]
    async fn test_two_level_double_miss_populates_both() {
        let clock = ManualClock::new();
        let (cache, front, back) = two_level(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(fetched.ok(), Some("a-1".into()));
        assert_eq!(provider.calls(), 1);

        let expected = Some(Fetched::Value("a-1".into(), Some(Ttls::new(secs(10), secs(20)))));
        assert_eq!(front.get(&key("a")).await, expected);
        assert_eq!(back.get(&key("a")).await, expected);

        cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_two_level_get_remove_clear() {
        let clock = ManualClock::new();
        let (cache, front, back) = two_level(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        back.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(front.get(&key("a")).await, None);
        assert_eq!(cache.get(&key("a")).await.and_then(Fetched::ok), Some("a-1".into()));

        cache.get_or_provide(&key("b"), provider.shared()).await;
        cache.remove(&key("b")).await.unwrap();
        assert_eq!(front.get(&key("b")).await, None);
        assert_eq!(back.get(&key("b")).await, None);

        cache.clear().await.unwrap();
        assert!(front.store().is_empty());
        assert!(back.store().is_empty());
    }

    #[tokio::test]
    async fn test_two_level_failure_reaches_both_tiers() {
        let clock = ManualClock::new();
        let (cache, front, back) = two_level(&clock);
        let provider = Counting::failing(Ttls::new(secs(1), secs(2)));

        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert!(matches!(fetched, Fetched::Failed(CacheError::Provider(_), _)));
        assert!(matches!(front.get(&key("a")).await, Some(Fetched::Failed(..))));
        assert!(matches!(back.get(&key("a")).await, Some(Fetched::Failed(..))));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_with_remote_cache_provider() {
        let clock = ManualClock::new();
        let local = memory_cache(&clock);
        let remote = Arc::new(memory_cache(&clock));
        let base = Counting::new(Ttls::new(secs(10), secs(20)));
        let provider: SharedProvider<String, String> =
            Arc::new(with_remote_cache(Arc::clone(&remote), base.shared()));

        local.get_or_provide(&key("a"), provider.clone()).await;
        assert!(remote.get(&key("a")).await.is_some());

        // a second local tier is filled from the remote one
        let other_local = memory_cache(&clock);
        let fetched = other_local.get_or_provide(&key("a"), provider).await;
        assert_eq!(fetched.ok(), Some("a-1".into()));
        assert_eq!(base.calls(), 1);
    }

    /// Provider recording the keys it was asked for
    struct Recording {
        seen: parking_lot::Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl ValueProvider<u64, String> for Recording {
        async fn provide(&self, key: &u64) -> Provided<String> {
            self.seen.lock().push(*key);
            Provided::ok(format!("user {key}"), Ttls::new(secs(10), secs(20)))
        }
    }

    #[tokio::test]
    async fn test_namespaced_keys_and_original_key_to_provider() {
        let clock = ManualClock::new();
        let shared = memory_cache(&clock);
        let users = NamespacedCache::new("app", "users", ":", shared.clone());
        let recording = Arc::new(Recording {
            seen: parking_lot::Mutex::new(Vec::new()),
        });
        let provider: SharedProvider<u64, String> = recording.clone();

        let fetched = users.get_or_provide(&42u64, provider).await;
        assert_eq!(fetched.ok(), Some("user 42".into()));
        assert_eq!(*recording.seen.lock(), vec![42]);

        assert!(shared.get(&key("app:users:42")).await.is_some());
        assert!(users.get(&42u64).await.is_some());

        users.remove(&42u64).await.unwrap();
        assert_eq!(shared.get(&key("app:users:42")).await, None);
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let clock = ManualClock::new();
        let shared = memory_cache(&clock);
        let users = NamespacedCache::new("app", "users", ":", shared.clone());
        let orders = NamespacedCache::new("app", "orders", ":", shared.clone());
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let u = users.get_or_provide(&key("1"), provider.shared()).await;
        let o = orders.get_or_provide(&key("1"), provider.shared()).await;

        assert_eq!(u.ok(), Some("1-1".into()));
        assert_eq!(o.ok(), Some("1-2".into()));
        assert_eq!(shared.store().len(), 2);
    }

    #[tokio::test]
    async fn test_namespaced_empty_key_is_cached() {
        let clock = ManualClock::new();
        let shared = memory_cache(&clock);
        let users = NamespacedCache::new("app", "users", ":", shared.clone());
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let fetched = users.get_or_provide(&key(""), provider.shared()).await;
        assert_eq!(fetched.ok(), Some("-1".into()));
        assert!(shared.get(&key("app:users:")).await.is_some());

        let cached = users.get_or_provide(&key(""), provider.shared()).await;
        assert_eq!(cached.ok(), Some("-1".into()));
        assert_eq!(provider.calls(), 1);

        users.remove(&key("")).await.unwrap();
        assert_eq!(users.get(&key("")).await, None);
    }

    #[tokio::test]
    async fn test_tuple_and_composite_keys() {
        let clock = ManualClock::new();
        let shared = memory_cache(&clock);
        let cache = NamespacedCache::with_prefix(KeyPrefix::from_prefix("t/"), shared.clone());
        let provider = provider_fn(|(org, id): (String, u32)| async move {
            Provided::ok(format!("{org}#{id}"), Ttls::halved(secs(20)))
        });

        let fetched = cache
            .get_or_provide(&("acme".to_string(), 7u32), provider)
            .await;
        assert_eq!(fetched.ok(), Some("acme#7".into()));
        assert!(shared.get(&key("t/acme:7")).await.is_some());

        let composite = CompositeKey::new().part("acme").part(7);
        assert_eq!(composite.cache_key(), "acme:7");
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let other = cache.clone();
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(
            other.get_or_provide(&key("a"), provider.shared()).await.ok(),
            Some("a-1".into())
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_ttl_is_served_forever() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::new(Ttls::new(Duration::MAX, Duration::MAX));

        let first = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(first.ok(), Some("a-1".into()));

        clock.advance(secs(86_400 * 365));
        let later = cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(
            later,
            Fetched::Value("a-1".into(), Some(Ttls::new(Duration::MAX, Duration::MAX)))
        );
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.pending_refreshes(), 0);
    }

    #[tokio::test]
    async fn test_unbounded_ttl_through_provider_fn() {
        let cache: MemCache = Cache::new(MemoryStore::with_defaults());
        let provider = provider_fn(|k: String| async move {
            Provided::ok(k, Ttls::new(Duration::MAX, Duration::MAX))
        });

        let fetched = cache.get_or_provide(&key("a"), provider).await;
        assert_eq!(fetched.ok(), Some("a".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stale_readers_refresh_once() {
        let clock = ManualClock::new();
        let cache = memory_cache(&clock);
        let provider = Counting::slow(Ttls::new(secs(10), secs(20)), Duration::from_millis(200));

        cache.get_or_provide(&key("a"), provider.shared()).await;
        clock.advance(secs(12));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let cache = cache.clone();
            let provider = provider.shared();
            handles.push(tokio::spawn(async move {
                cache.get_or_provide(&key("a"), provider).await
            }));
        }
        for handle in handles {
            let stale = handle.await.unwrap();
            assert_eq!(stale.value().map(String::as_str), Some("a-1"));
        }

        cache.wait_for_refreshes().await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.get(&key("a")).await.and_then(Fetched::ok), Some("a-2".into()));
    }

    #[tokio::test]
    async fn test_refresh_timeout_abandons_slow_refresh() {
        let clock = ManualClock::new();
        let store = MemoryStore::with_clock(MemoryConfig::default(), Arc::new(clock.clone()));
        let config = CacheConfig::default()
            .with_clock(clock.clone())
            .refresh_timeout(Duration::from_millis(50));
        let cache: MemCache = Cache::with_config(store, config);
        let fast = Counting::new(Ttls::new(secs(10), secs(20)));

        cache.get_or_provide(&key("a"), fast.shared()).await;
        clock.advance(secs(12));

        let slow = Counting::slow(Ttls::new(secs(10), secs(20)), secs(60));
        let stale = cache.get_or_provide(&key("a"), slow.shared()).await;
        assert_eq!(stale.value().map(String::as_str), Some("a-1"));

        tokio::time::timeout(secs(5), cache.wait_for_refreshes())
            .await
            .expect("refresh outlived its timeout");
        assert_eq!(slow.calls(), 1);
        assert_eq!(cache.get(&key("a")).await.and_then(Fetched::ok), Some("a-1".into()));

        // the abandoned refresh released the key
        cache.get_or_provide(&key("a"), fast.shared()).await;
        cache.wait_for_refreshes().await;
        assert_eq!(cache.get(&key("a")).await.and_then(Fetched::ok), Some("a-2".into()));
    }

    #[tokio::test]
    async fn test_refresh_reports_failed_reread() {
        let stats = StatsMonitoring::new();
        let cache: Cache<String, String, BrokenStore, StatsMonitoring> =
            Cache::with_monitoring(BrokenStore, stats.clone(), CacheConfig::default());
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let fetched = cache
            .get_or_provide_async(&key("a"), provider.shared(), "loading".into())
            .await;
        assert_eq!(fetched, Fetched::Default("loading".into()));
        assert_eq!(stats.stats().failures, 1);

        // detached update: failed re-read, then failed write
        cache.wait_for_refreshes().await;
        assert_eq!(provider.calls(), 1);
        assert_eq!(stats.stats().failures, 3);
    }

    #[tokio::test]
    async fn test_two_level_async_fills_both_tiers() {
        let clock = ManualClock::new();
        let (cache, front, back) = two_level(&clock);
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));

        let fetched = cache
            .get_or_provide_async(&key("a"), provider.shared(), "loading".into())
            .await;
        assert_eq!(fetched, Fetched::Default("loading".into()));

        front.wait_for_refreshes().await;
        assert_eq!(provider.calls(), 1);

        let expected = Some(Fetched::Value("a-1".into(), Some(Ttls::new(secs(10), secs(20)))));
        assert_eq!(front.get(&key("a")).await, expected);
        assert_eq!(back.get(&key("a")).await, expected);

        let cached = cache
            .get_or_provide_async(&key("a"), provider.shared(), "loading".into())
            .await;
        assert_eq!(cached.ok(), Some("a-1".into()));
    }

    #[tokio::test]
    async fn test_two_level_stale_back_entry_not_copied() {
        let clock = ManualClock::new();
        let (cache, front, back) = two_level(&clock);
        let seed = Counting::new(Ttls::new(secs(10), secs(20)));
        back.get_or_provide(&key("a"), seed.shared()).await;

        clock.advance(secs(12));
        let provider = Counting::new(Ttls::new(secs(10), secs(20)));
        let fetched = cache.get_or_provide(&key("a"), provider.shared()).await;

        assert_eq!(fetched.ok(), Some("a-1".into()));
        assert_eq!(front.get(&key("a")).await, None);
        assert_eq!(front.pending_refreshes(), 0);

        // once the back tier refreshed, the front keeps a fresh copy
        back.wait_for_refreshes().await;
        assert_eq!(provider.calls(), 1);
        cache.get_or_provide(&key("a"), provider.shared()).await;
        assert_eq!(
            front.get(&key("a")).await,
            Some(Fetched::Value("a-1".into(), Some(Ttls::new(secs(10), secs(20)))))
        );
        assert_eq!(provider.calls(), 1);
    }
}
