//! API Module
//!
//! HTTP handlers and routing exposing the cache store contract.
//!
//! # Endpoints
//! - `PUT /cache/:key` - Store a value with optional expiry
//! - `GET /cache/:key` - Retrieve a value, optionally removing it
//! - `DELETE /cache/:key` - Remove a key
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
