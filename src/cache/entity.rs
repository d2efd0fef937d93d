//! Cache Entity Module
//!
//! Pairs a stored value with its optional expiry and decides liveness at read time.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Value;

// == Cache Entity ==
/// A stored value together with its absolute expiry.
///
/// This is also the layout persisted by `PersistentCache`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntity {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl CacheEntity {
    // == Is Expired ==
    /// Checks whether the entity is expired at `now_ms`.
    ///
    /// Boundary condition: an entity expiring exactly at `now_ms` is still
    /// live; it is expired only once the clock has moved past it.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => expires < now_ms,
            None => false,
        }
    }

    /// Checks whether the entity is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entity has expired
    /// - `Some(remaining_ms)` if the entity has an expiry in the future
    /// - `None` if the entity never expires
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            u64::try_from(expires - now).unwrap_or(0)
        })
    }
}

// == Pack ==
/// Wraps `value` with an optional absolute expiry.
pub fn pack_entity(value: Value, expires_at: Option<DateTime<Utc>>) -> CacheEntity {
    CacheEntity {
        value,
        expires_at: expires_at.map(|at| at.timestamp_millis()),
    }
}

// == Extract ==
/// Returns the live value held by `entity`, judged against the wall clock.
pub fn extract_entity(entity: Option<&CacheEntity>) -> Option<&Value> {
    extract_entity_at(entity, current_timestamp_ms())
}

/// Returns the live value held by `entity`, judged against `now_ms`.
///
/// Absent and expired entities both yield `None`. Nothing is removed here;
/// an expired entity stays wherever it is stored until overwritten or deleted.
pub fn extract_entity_at(entity: Option<&CacheEntity>, now_ms: i64) -> Option<&Value> {
    let entity = entity?;
    if entity.is_expired_at(now_ms) {
        None
    } else {
        Some(&entity.value)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        Err(before_epoch) => {
            -i64::try_from(before_epoch.duration().as_millis()).unwrap_or(i64::MAX)
        }
    }
}
