//! In-Memory Cache Module
//!
//! Process-local cache backed by a HashMap, deep-copying on the way in and out.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{
    deep_copy, extract_entity, pack_entity, validate_key, CacheEntity, CacheStore, Value,
};
use crate::error::Result;

static DEFAULT: OnceLock<MemoryCache> = OnceLock::new();

// == Memory Cache ==
/// In-memory cache with lazy expiry and value isolation.
///
/// Expired entries keep their slot until they are overwritten, removed, or
/// read with `remove_after`; nothing sweeps them.
///
/// # Example
/// ```rust,no_run
/// use value_cache::cache::{CacheStore, MemoryCache, Value};
///
/// #[tokio::main]
/// async fn main() -> value_cache::error::Result<()> {
///     let cache = MemoryCache::global();
///     cache.set("greeting", Value::from("hello"), None).await?;
///     assert_eq!(cache.get("greeting", true).await?, Some(Value::from("hello")));
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntity>>,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates an empty cache with its own independent mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide default instance, creating it on first use.
    pub fn global() -> &'static MemoryCache {
        DEFAULT.get_or_init(MemoryCache::new)
    }

    // == Length ==
    /// Returns the number of occupied slots, expired entries included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if no slot is occupied.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn set(&self, key: &str, value: Value, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        validate_key(key)?;
        let entity = pack_entity(deep_copy(&value)?, expires_at);

        self.entries.write().await.insert(key.to_string(), entity);
        debug!(key, kind = value.kind(), ?expires_at, "memory cache set");
        Ok(())
    }

    async fn get(&self, key: &str, remove_after: bool) -> Result<Option<Value>> {
        validate_key(key)?;

        let value = if remove_after {
            // Read and clear happen under the same write guard
            let taken = self.entries.write().await.remove(key);
            extract_entity(taken.as_ref()).map(deep_copy).transpose()?
        } else {
            let entries = self.entries.read().await;
            extract_entity(entries.get(key)).map(deep_copy).transpose()?
        };

        debug!(key, remove_after, hit = value.is_some(), "memory cache get");
        Ok(value)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let existed = self.entries.write().await.remove(key).is_some();
        debug!(key, existed, "memory cache remove");
        Ok(())
    }
}
