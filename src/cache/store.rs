//! Key–value stores backing the sample cache.
//!
//! Entries never expire; correctness only depends on request equality. Two
//! concurrent misses on the same key may both compute and store, which is
//! harmless because the stored payloads are identical.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use super::key::CacheKey;
use super::redis_store::RedisCacheStore;
use crate::error::CacheError;

/// Plain get/put storage keyed by [`CacheKey`]. No transactional semantics.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &CacheKey, value: &str) -> Result<(), CacheError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Process-local store, used by tests and by `--in-process` runs.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .insert(key.clone(), value.to_string());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sample_cache (
    cache_key   TEXT PRIMARY KEY,
    payload     TEXT NOT NULL,
    stored_at   TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-backed store for a single service host.
#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub async fn open(path: &str) -> Result<Self, CacheError> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        tracing::info!(path = path, "Sample cache opened");
        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let row = sqlx::query("SELECT payload FROM sample_cache WHERE cache_key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("payload")))
    }

    async fn put(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        sqlx::query(
            "INSERT INTO sample_cache (cache_key, payload) VALUES (?1, ?2)
             ON CONFLICT(cache_key) DO UPDATE SET payload = excluded.payload,
                 stored_at = datetime('now')",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// Open a store from a URL: `memory://`, `sqlite://<path>` or `redis://...`.
pub async fn open_store(url: &str) -> Result<Arc<dyn CacheStore>, CacheError> {
    if url == "memory" || url.starts_with("memory://") {
        return Ok(Arc::new(MemoryCacheStore::new()));
    }
    if let Some(path) = url.strip_prefix("sqlite://") {
        if path.is_empty() {
            return Err(CacheError::UnsupportedUrl(url.to_string()));
        }
        return Ok(Arc::new(SqliteCacheStore::open(path).await?));
    }
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        return Ok(Arc::new(RedisCacheStore::connect(url).await?));
    }
    Err(CacheError::UnsupportedUrl(url.to_string()))
}
