//! Request and Response models for the saldo API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use crate::cache::PageQuery;
pub use requests::{CreateSaldoRequest, UpdateSaldoRequest};
pub use responses::{
    ApiResponse, CacheStatsResponse, ErrorResponse, HealthResponse, PaginatedResponse,
    PaginationMeta,
};
