//! Response DTOs for the saldo API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

/// Envelope for single-value responses
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Always "success"
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Creates a new success envelope
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }
}

/// Pagination metadata attached to listing responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_records: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: u32, page_size: u32, total_records: i64) -> Self {
        let size = i64::from(page_size.max(1));
        Self {
            page,
            page_size,
            total_records,
            total_pages: (total_records.max(0) + size - 1) / size,
        }
    }
}

/// Envelope for paginated listings
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn success(message: impl Into<String>, data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
            pagination,
        }
    }
}

/// Response body for the cache stats endpoint (GET /cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses (absent, expired or undecodable)
    pub misses: u64,
    /// Number of backend calls that failed or timed out
    pub faults: u64,
    /// Number of payloads written
    pub writes: u64,
    /// Number of keys invalidated
    pub invalidations: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,
    /// Error message describing what went wrong
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}
