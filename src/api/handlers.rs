//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache handle is internally synchronized, so cloning the state is cheap
/// and needs no outer lock.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache handle
    pub cache: Cache<String>,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Cache<String>) -> Self {
        Self { cache }
    }

    /// Builds the cache from configuration.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Cache::new(config.clone())?))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair with optional TTL (seconds) and cost. The write is
/// applied before the response is sent, so admission failures are reported.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = Duration::from_secs(req.ttl.unwrap_or(0));
    let cost = req.cost.unwrap_or(0);
    state
        .cache
        .put_with_ttl_sync(&req.key, req.value, cost, ttl)?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.cache.lookup(&key)?;
    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.del(&key) {
        return Err(CacheError::NotFound);
    }
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
