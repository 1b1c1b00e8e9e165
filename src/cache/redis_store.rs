//! Redis-backed cache store, shared by every service replica.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::key::CacheKey;
use super::store::CacheStore;
use crate::error::CacheError;

/// Namespace prepended to every Redis key.
const KEY_NAMESPACE: &str = "route-forge:sample";

pub struct RedisCacheStore {
    /// Connection manager (handles reconnection automatically).
    redis: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        tracing::info!(url = redis_url, "Connected to Redis sample cache");
        Ok(Self { redis })
    }

    fn redis_key(key: &CacheKey) -> String {
        format!("{}:{}", KEY_NAMESPACE, key)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(Self::redis_key(key)).await?;
        Ok(value)
    }

    async fn put(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(Self::redis_key(key), value).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
