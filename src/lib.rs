//! tinycache - a cost-bounded in-memory cache with TinyLFU admission
//!
//! The engine lives in [`cache`]; [`api`] puts an HTTP front end over it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub(crate) mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheBuilder, CacheStats, HashAlgorithm};
pub use config::Config;
pub use error::{CacheError, Result};
