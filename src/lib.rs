//! Value Cache - a key-value cache that stores values, not references
//!
//! Provides an in-memory and a persistent backend sharing one store contract,
//! with lazy TTL expiry and deep-copy value isolation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{CacheStore, CacheStoreExt, MemoryCache, PersistentCache, Value};
pub use config::{BackendKind, Config};
