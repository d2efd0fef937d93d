//! Cache Store Module
//!
//! The contract every cache backend implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::cache::Value;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// A string-keyed value store with lazy expiry.
///
/// Implementations must return values that share nothing with what they
/// keep internally, and must treat a missing key as `Ok(None)` rather than
/// an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// A name for tracing.
    ///
    /// # Example
    /// - "memory"
    /// - "persistent"
    fn name(&self) -> &'static str;

    /// Stores `value` under `key`, replacing any previous entry and its expiry.
    ///
    /// `expires_at = None` means the entry never expires.
    async fn set(&self, key: &str, value: Value, expires_at: Option<DateTime<Utc>>)
        -> Result<()>;

    /// Returns the live value under `key`.
    ///
    /// With `remove_after`, the stored entry is deleted as part of the same
    /// read, even when it had already expired.
    async fn get(&self, key: &str, remove_after: bool) -> Result<Option<Value>>;

    /// Deletes the entry under `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}

// == Key Validation ==
/// Rejects empty keys.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
    }
    Ok(())
}

// == Typed Access ==
/// Stores and loads any serde type through a [`CacheStore`].
///
/// Values cross a `serde_json` boundary into the plain-JSON subset of
/// [`Value`], so structs come back as maps internally.
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    async fn set_typed<T>(
        &self,
        key: &str,
        value: &T,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let json = serde_json::to_value(value)
            .map_err(|e| CacheError::InvalidValue(format!("cannot encode value: {e}")))?;
        self.set(key, Value::from(json), expires_at).await
    }

    async fn get_typed<T>(&self, key: &str, remove_after: bool) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key, remove_after).await? {
            Some(value) => serde_json::from_value(value.to_json())
                .map(Some)
                .map_err(|e| CacheError::InvalidValue(format!("cannot decode value: {e}"))),
            None => Ok(None),
        }
    }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}
