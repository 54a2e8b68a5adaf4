//! Remote cache tier backed by Redis

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use sweet_cache_core::{
    CacheError, CacheKey, CacheMonitoring, Cacher, Fetched, JsonSerializer, NoopMonitoring,
    Result, Serializer, SharedProvider, Ttls, ValueProvider,
};

use super::circuit_breaker::CircuitBreaker;
use super::config::RedisConfig;

/// Longest expiry sent as `PX`; Redis rejects deadlines it can't represent
const MAX_PX_MILLIS: u128 = 1 << 53;

/// `PX` argument for `ttl`, `None` when the key should not expire
fn px_millis(ttl: Duration) -> Option<u64> {
    let millis = ttl.as_millis();
    (millis <= MAX_PX_MILLIS).then_some(millis as u64)
}

/// Remote tier storing serialized values in Redis
///
/// Values are written with the provider's *actual* TTL, so Redis drops them
/// once they would stop being fresh. Reads report the key's remaining TTL,
/// which lets a local tier in front keep the value exactly as long.
///
/// `get` always reports nothing (answering would need a network call) and
/// `clear` does nothing: a shared remote store is never wiped wholesale.
/// Redis failures never reach the caller; they are reported to monitoring
/// and the call degrades to "miss, ask the provider".
pub struct RedisCache<V, S = JsonSerializer> {
    pool: Pool<RedisConnectionManager>,
    config: Arc<RedisConfig>,
    serializer: S,
    breaker: CircuitBreaker,
    monitoring: Arc<dyn CacheMonitoring>,
    _value: PhantomData<fn() -> V>,
}

impl<V, S: Clone> Clone for RedisCache<V, S> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            config: Arc::clone(&self.config),
            serializer: self.serializer.clone(),
            breaker: self.breaker.clone(),
            monitoring: Arc::clone(&self.monitoring),
            _value: PhantomData,
        }
    }
}

impl<V> RedisCache<V, JsonSerializer> {
    /// Connect using JSON encoding
    pub async fn new(config: RedisConfig) -> Result<Self> {
        Self::with_serializer(config, JsonSerializer).await
    }

    /// Create without opening connections up front
    pub fn connect_lazy(config: RedisConfig) -> Result<Self> {
        Self::lazy_with_serializer(config, JsonSerializer)
    }
}

impl<V, S: Serializer> RedisCache<V, S> {
    /// Connect using a custom serializer
    pub async fn with_serializer(config: RedisConfig, serializer: S) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self::from_pool(pool, config, serializer))
    }

    /// Create with a custom serializer without opening connections up front
    pub fn lazy_with_serializer(config: RedisConfig, serializer: S) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build_unchecked(manager);

        Ok(Self::from_pool(pool, config, serializer))
    }

    fn from_pool(pool: Pool<RedisConnectionManager>, config: RedisConfig, serializer: S) -> Self {
        let breaker = CircuitBreaker::new(config.failure_threshold, config.reset_timeout);
        Self {
            pool,
            config: Arc::new(config),
            serializer,
            breaker,
            monitoring: Arc::new(NoopMonitoring),
            _value: PhantomData,
        }
    }

    /// Report Redis failures to `monitoring`
    pub fn with_monitoring(mut self, monitoring: impl CacheMonitoring) -> Self {
        self.monitoring = Arc::new(monitoring);
        self
    }

    /// The breaker guarding Redis calls
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Key as stored in Redis
    pub fn redis_key(&self, raw: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, raw),
            None => raw.to_string(),
        }
    }

    /// Redis TTL for a value fresh for `actual`; `None` means don't write
    fn write_ttl(&self, actual: Duration) -> Option<Duration> {
        if actual.is_zero() {
            return None;
        }
        let jitter_range = self.config.ttl_jitter.as_millis() as u64;
        if jitter_range == 0 {
            return Some(actual);
        }
        let jitter = rand::random::<u64>() % jitter_range;
        Some(actual.saturating_add(Duration::from_millis(jitter)))
    }

    async fn connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    /// Run a Redis call through the circuit breaker
    async fn guarded<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.breaker.allow_request() {
            return Err(CacheError::Connection("circuit breaker open".to_string()));
        }
        let result = op.await;
        self.breaker.record(&result);
        result
    }

    /// GET the raw bytes and the key's remaining lifetime
    async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Option<Duration>)>> {
        self.guarded(async {
            let mut conn = self.connection().await?;
            let mut pipe = redis::pipe();
            pipe.get(key).cmd("PTTL").arg(key);

            let (bytes, pttl): (Option<Vec<u8>>, i64) = pipe
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            // PTTL is negative for keys without expiry
            let remaining = u64::try_from(pttl)
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis);
            Ok(bytes.map(|bytes| (bytes, remaining)))
        })
        .await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(bytes);
        if let Some(millis) = px_millis(ttl) {
            cmd.arg("PX").arg(millis);
        }
        self.guarded(async {
            let mut conn = self.connection().await?;
            cmd.query_async::<()>(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.guarded(async {
            let mut conn = self.connection().await?;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))
        })
        .await
    }
}

impl<V, S> RedisCache<V, S>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
{
    /// Cached value for `redis_key`; read failures count as a miss
    async fn lookup(&self, redis_key: &str) -> Option<Fetched<V>> {
        let decoded = match self.fetch(redis_key).await {
            Ok(Some((bytes, remaining))) => self
                .serializer
                .deserialize::<V>(&bytes)
                .map(|value| Fetched::Value(value, remaining.map(|ttl| Ttls::new(ttl, ttl)))),
            Ok(None) => return None,
            Err(err) => Err(err),
        };

        match decoded {
            Ok(fetched) => Some(fetched),
            Err(err @ CacheError::Deserialization(_)) => {
                tracing::warn!(
                    key = redis_key,
                    format = self.serializer.format(),
                    "undecodable remote entry treated as a miss"
                );
                self.monitoring.get_failed(&redis_key, &err);
                None
            }
            Err(err) => {
                self.monitoring.get_failed(&redis_key, &err);
                None
            }
        }
    }

    /// Ask the provider and write a successful value back
    async fn provide_and_store<K>(
        &self,
        key: &K,
        redis_key: &str,
        provider: &dyn ValueProvider<K, V>,
    ) -> Fetched<V> {
        let provided = provider.provide(key).await;
        let ttl = provided.ttl.normalized();

        match provided.result {
            Ok(value) => {
                if let Some(write_ttl) = self.write_ttl(ttl.actual) {
                    let written = match self.serializer.serialize(&value) {
                        Ok(bytes) => self.put(redis_key, bytes, write_ttl).await,
                        Err(err) => Err(err),
                    };
                    if let Err(err) = written {
                        self.monitoring.put_failed(&redis_key, &err);
                    }
                }
                Fetched::Value(value, Some(ttl))
            }
            // Failures are not shared through Redis
            Err(err) => Fetched::Failed(err, Some(ttl)),
        }
    }
}

#[async_trait]
impl<K, V, S> Cacher<K, V> for RedisCache<V, S>
where
    K: CacheKey + Clone + Debug + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
{
    async fn get_or_provide(&self, key: &K, provider: SharedProvider<K, V>) -> Fetched<V> {
        let redis_key = self.redis_key(&key.cache_key());
        if let Some(hit) = self.lookup(&redis_key).await {
            self.monitoring.hit(&redis_key);
            return hit;
        }

        self.monitoring.miss(&redis_key);
        self.provide_and_store(key, &redis_key, provider.as_ref()).await
    }

    async fn get_or_provide_async(
        &self,
        key: &K,
        provider: SharedProvider<K, V>,
        default: V,
    ) -> Fetched<V> {
        let redis_key = self.redis_key(&key.cache_key());
        if let Some(hit) = self.lookup(&redis_key).await {
            self.monitoring.hit(&redis_key);
            return hit;
        }

        self.monitoring.miss(&redis_key);
        let this = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            this.provide_and_store(&key, &redis_key, provider.as_ref()).await;
        });
        Fetched::Default(default)
    }

    async fn get(&self, _key: &K) -> Option<Fetched<V>> {
        None
    }

    async fn remove(&self, key: &K) -> Result<()> {
        let redis_key = self.redis_key(&key.cache_key());
        if let Err(err) = self.delete(&redis_key).await {
            self.monitoring.remove_failed(&redis_key, &err);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        tracing::debug!("clear is a no-op for the redis tier");
        Ok(())
    }
}
