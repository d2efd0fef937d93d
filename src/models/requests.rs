//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Request body for the SET operation (PUT /cache/:key)
///
/// # Fields
/// - `value`: Any JSON value to store
/// - `expires_at`: Optional absolute expiry (RFC 3339)
/// - `ttl`: Optional expiry relative to now, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: serde_json::Value,
    /// Absolute expiry instant
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Relative expiry in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.expires_at.is_some() && self.ttl.is_some() {
            return Some("Specify at most one of 'expires_at' and 'ttl'".to_string());
        }
        if let Some(ttl) = self.ttl {
            if i64::try_from(ttl).map_or(true, |secs| Duration::try_seconds(secs).is_none()) {
                return Some("TTL is out of range".to_string());
            }
        }
        None
    }

    /// Resolves the absolute expiry of the request relative to `now`.
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.expires_at, self.ttl) {
            (Some(at), _) => Some(at),
            (None, Some(ttl)) => i64::try_from(ttl)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl)),
            (None, None) => None,
        }
    }
}

/// Query string for the GET operation (GET /cache/:key)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    /// Delete the entry as part of this read
    #[serde(default)]
    pub remove_after: bool,
}
