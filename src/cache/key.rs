//! Content-addressed cache keys.
//!
//! A request is reduced to a canonical JSON string (object keys sorted
//! lexicographically at every depth, array order preserved) and hashed with
//! SHA-256. The hex digest is prefixed with a schema version tag so a schema
//! change invalidates every stored entry without deleting anything.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Version tag prepended to every cache key.
pub const CACHE_KEY_VERSION: &str = "v4";

/// Hash of a normalized request, used as the cache store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from an already canonical string.
    pub fn from_canonical(canonical: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();
        Self(format!("{}:{}", CACHE_KEY_VERSION, hex::encode(digest)))
    }

    /// Build a key from any JSON value.
    pub fn from_value(value: &Value) -> Self {
        Self::from_canonical(&canonical_json(value))
    }

    /// Build a key from any serializable request.
    pub fn for_request<T: Serialize>(request: &T) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(request)?;
        Ok(Self::from_value(&value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic stringification of a JSON value.
///
/// Two values that are deeply equal up to object key ordering always produce
/// the same string.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
