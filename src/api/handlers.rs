//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::cache::{CacheStore, FileBackend, MemoryCache, PersistentCache, Value};
use crate::config::{BackendKind, Config};
use crate::error::{CacheError, Result};
use crate::models::{DeleteResponse, GetQuery, GetResponse, HealthResponse, SetRequest, SetResponse};

/// Application state shared across all handlers.
///
/// The store does its own locking, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Backend serving the requests
    pub cache: Arc<dyn CacheStore>,
}

impl AppState {
    /// Creates a new AppState around the given store.
    pub fn new(cache: impl CacheStore + 'static) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the storage directory when the file backend is selected.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let state = match config.backend {
            BackendKind::Memory => Self::new(MemoryCache::new()),
            BackendKind::File => {
                let backend = FileBackend::open(&config.storage_dir).await?;
                Self::new(PersistentCache::with_prefix(backend, config.key_prefix.clone()))
            }
        };
        Ok(state)
    }
}

/// Handler for PUT /cache/:key
///
/// Stores a JSON value under the key with an optional expiry.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let expires_at = req.expiry(Utc::now());
    state
        .cache
        .set(&key, Value::from(req.value), expires_at)
        .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /cache/:key
///
/// Retrieves a live value; `?remove_after=true` deletes it in the same step.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key, query.remove_after).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value.to_json()))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
///
/// Removing a missing key still succeeds.
pub async fn remove_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.remove(&key).await?;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.name()))
}
