//! Content-addressed caching for solved samples.
//!
//! - [`key`]: canonical request encoding and versioned SHA-256 keys
//! - [`store`]: the [`CacheStore`] trait with in-memory and SQLite backends
//! - [`redis_store`]: Redis backend for multi-replica deployments

pub mod key;
pub mod redis_store;
pub mod store;

pub use key::{canonical_json, CacheKey, CACHE_KEY_VERSION};
pub use redis_store::RedisCacheStore;
pub use store::{open_store, CacheStore, MemoryCacheStore, SqliteCacheStore};
