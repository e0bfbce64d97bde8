//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its HTTP front end.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key not found in cache, or its conflict hash did not match
    #[error("Key not found")]
    NotFound,

    /// Key is still stored but its expiration has passed
    #[error("Key expired")]
    Expired,

    /// Invalid request data (empty key, negative ttl or cost)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A single item costs at least the whole budget
    #[error("Cost {cost} is too large for a cache with max cost {max}")]
    CostTooLarge { cost: i64, max: i64 },

    /// Admission control refused the item
    #[error("Rejected by admission policy")]
    Rejected,

    /// Construction-time sizing or parameter error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The write pipeline has been shut down
    #[error("Cache is closed")]
    Closed,
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound | CacheError::Expired => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::CostTooLarge { .. } => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::Rejected | CacheError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
