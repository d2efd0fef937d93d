//! Persistent Cache Module
//!
//! Cache over a durable storage backend, with namespaced physical keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::backend::StorageBackend;
use crate::cache::{extract_entity, pack_entity, validate_key, CacheEntity, CacheStore, Value};
use crate::error::{BackendError, CacheError, Result};

/// Prefix put in front of every logical key in the physical store
pub const DEFAULT_KEY_PREFIX: &str = "$local:";

// == Persistent Cache ==
/// Cache that persists JSON-encoded entities through a [`StorageBackend`].
///
/// Isolation comes from the serialization boundary: every read decodes a
/// fresh value, so no deep copy is needed.
pub struct PersistentCache<B> {
    backend: B,
    prefix: String,
    /// Serializes operations so a read-then-remove is atomic
    op_lock: Mutex<()>,
}

impl<B: StorageBackend> PersistentCache<B> {
    /// Creates a cache over `backend` using [`DEFAULT_KEY_PREFIX`].
    pub fn new(backend: B) -> Self {
        Self::with_prefix(backend, DEFAULT_KEY_PREFIX)
    }

    /// Creates a cache over `backend` with a custom key prefix.
    ///
    /// An empty prefix would reserve every key, so it falls back to
    /// [`DEFAULT_KEY_PREFIX`].
    pub fn with_prefix(backend: B, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if prefix.is_empty() {
            warn!("Empty key prefix, using '{}'", DEFAULT_KEY_PREFIX);
            prefix = DEFAULT_KEY_PREFIX.to_string();
        }

        Self {
            backend,
            prefix,
            op_lock: Mutex::new(()),
        }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // == Key Namespacing ==
    /// Maps a logical key to its physical key.
    ///
    /// Keys that already carry the prefix are rejected so two logical keys
    /// can never land on the same physical slot.
    pub fn namespaced_key(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        if key.starts_with(&self.prefix) {
            return Err(CacheError::InvalidKey(format!(
                "Key must not start with '{}'",
                self.prefix
            )));
        }
        Ok(format!("{}{}", self.prefix, key))
    }
}

#[async_trait]
impl<B: StorageBackend> CacheStore for PersistentCache<B> {
    fn name(&self) -> &'static str {
        "persistent"
    }

    async fn set(&self, key: &str, value: Value, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        let physical = self.namespaced_key(key)?;
        if let Some(reason) = value.find_unpersistable() {
            return Err(CacheError::InvalidValue(reason));
        }

        let entity = pack_entity(value, expires_at);
        let payload = serde_json::to_vec(&entity).map_err(BackendError::Encode)?;

        let _guard = self.op_lock.lock().await;
        self.backend.write(&physical, payload).await?;
        debug!(key, backend = self.backend.name(), ?expires_at, "persistent cache set");
        Ok(())
    }

    async fn get(&self, key: &str, remove_after: bool) -> Result<Option<Value>> {
        let physical = self.namespaced_key(key)?;

        let _guard = self.op_lock.lock().await;
        let Some(payload) = self.backend.read(&physical).await? else {
            debug!(key, backend = self.backend.name(), "persistent cache miss");
            return Ok(None);
        };

        let entity: CacheEntity =
            serde_json::from_slice(&payload).map_err(|source| BackendError::Corrupt {
                key: physical.clone(),
                source,
            })?;

        if remove_after {
            self.backend.delete(&physical).await?;
        }

        let value = extract_entity(Some(&entity)).cloned();
        debug!(
            key,
            backend = self.backend.name(),
            remove_after,
            hit = value.is_some(),
            "persistent cache get"
        );
        Ok(value)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let physical = self.namespaced_key(key)?;

        let _guard = self.op_lock.lock().await;
        self.backend.delete(&physical).await?;
        debug!(key, backend = self.backend.name(), "persistent cache remove");
        Ok(())
    }
}
