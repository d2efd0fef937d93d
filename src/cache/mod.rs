//! Cache Module
//!
//! Value model, deep copy, entity expiry, and the two cache backends.

pub mod backend;
mod copy;
mod entity;
mod memory;
mod persistent;
mod store;
mod value;


// Re-export public types
pub use backend::{FileBackend, StorageBackend, VolatileBackend};
pub use copy::deep_copy;
pub use entity::{
    current_timestamp_ms, extract_entity, extract_entity_at, pack_entity, CacheEntity,
};
pub use memory::MemoryCache;
pub use persistent::{PersistentCache, DEFAULT_KEY_PREFIX};
pub use store::{validate_key, CacheStore, CacheStoreExt};
pub use value::{ResourceHandle, Value};
