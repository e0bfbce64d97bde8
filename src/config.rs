//! Configuration Module
//!
//! Handles loading and validating cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::HashAlgorithm;
use crate::error::{CacheError, Result};

/// Lower bound for the frequency sketch key ceiling.
const MIN_KEY_COUNT: u64 = 64;
/// Upper bound for the frequency sketch key ceiling.
const MAX_KEY_COUNT: u64 = 1 << 24;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of store shards, must be a power of two
    pub shards: usize,
    /// Total cost budget of the cache
    pub max_cost: i64,
    /// Expected average cost per item, 0 when unknown
    pub avg_cost: i64,
    /// Width in seconds of one expiration bucket
    pub bucket_interval: u64,
    /// Number of read hashes batched before they reach the policy
    pub access_buffer_size: usize,
    /// Capacity of the pending-write channel
    pub write_buffer_size: usize,
    /// Key hashing algorithm
    pub hash: HashAlgorithm,
    /// Log per-item pipeline failures
    pub log: bool,
    /// Feed `get` calls into the frequency sketch
    pub record_reads: bool,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a config with the given cost budget and every other field defaulted.
    pub fn with_max_cost(max_cost: i64) -> Self {
        Self {
            max_cost,
            ..Self::default()
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SHARDS` - Store shard count (default: 256)
    /// - `MAX_COST` - Total cost budget (default: 1 GiB)
    /// - `AVG_COST` - Average item cost hint (default: unset)
    /// - `BUCKET_INTERVAL` - Expiration bucket width in seconds (default: 5)
    /// - `ACCESS_BUFFER_SIZE` - Read batch size (default: 64)
    /// - `WRITE_BUFFER_SIZE` - Pending-write channel capacity (default: 32768)
    /// - `HASH` - Hash algorithm name (default: fnv-xx)
    /// - `CACHE_LOG` - Log pipeline failures (default: false)
    /// - `RECORD_READS` - Count reads as accesses (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shards: env_or("SHARDS", defaults.shards),
            max_cost: env_or("MAX_COST", defaults.max_cost),
            avg_cost: env_or("AVG_COST", defaults.avg_cost),
            bucket_interval: env_or("BUCKET_INTERVAL", defaults.bucket_interval),
            access_buffer_size: env_or("ACCESS_BUFFER_SIZE", defaults.access_buffer_size),
            write_buffer_size: env_or("WRITE_BUFFER_SIZE", defaults.write_buffer_size),
            hash: env::var("HASH")
                .ok()
                .and_then(|v| HashAlgorithm::parse(&v))
                .unwrap_or(defaults.hash),
            log: env_or("CACHE_LOG", defaults.log),
            record_reads: env_or("RECORD_READS", defaults.record_reads),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Checks the construction-time invariants.
    pub fn validate(&self) -> Result<()> {
        if self.max_cost <= 0 {
            return Err(CacheError::InvalidConfig(
                "max_cost must be greater than zero".to_string(),
            ));
        }
        if !self.shards.is_power_of_two() {
            return Err(CacheError::InvalidConfig(format!(
                "shard count {} must be a power of two",
                self.shards
            )));
        }
        if self.avg_cost < 0 {
            return Err(CacheError::InvalidConfig(
                "avg_cost must not be negative".to_string(),
            ));
        }
        if self.bucket_interval == 0 {
            return Err(CacheError::InvalidConfig(
                "bucket_interval must be greater than zero".to_string(),
            ));
        }
        if self.access_buffer_size == 0 || self.write_buffer_size == 0 {
            return Err(CacheError::InvalidConfig(
                "buffer sizes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Key-count ceiling used to size the frequency sketch and bloom filter.
    ///
    /// `max_cost / avg_cost * 10` when an average cost is known, otherwise
    /// `max_cost * 10`, clamped to a sane range.
    pub fn max_key_count(&self) -> u64 {
        let max_cost = self.max_cost.max(0) as u64;
        let keys = if self.avg_cost > 0 {
            (max_cost / self.avg_cost as u64).saturating_mul(10)
        } else {
            max_cost.saturating_mul(10)
        };
        keys.clamp(MIN_KEY_COUNT, MAX_KEY_COUNT)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shards: 256,
            max_cost: 1 << 30,
            avg_cost: 0,
            bucket_interval: 5,
            access_buffer_size: 64,
            write_buffer_size: 32 * 1024,
            hash: HashAlgorithm::default(),
            log: false,
            record_reads: true,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
