//! API Module
//!
//! HTTP handlers and routing for the saldo REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Prometheus metrics
//! - `GET /cache/stats` - Cache statistics
//! - `/api/saldos/...` - Saldo queries and mutations

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
