//! Cache Module
//!
//! Cost-bounded in-memory cache with TinyLFU admission, sampled eviction and
//! bucketed TTL expiration.

mod bitset;
mod bloom;
mod cost;
mod coster;
pub(crate) mod engine;
pub(crate) mod entry;
mod expiration;
mod hasher;
mod policy;
mod ring;
mod sketch;
mod stats;
mod store;
mod tinylfu;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use bitset::BitSet;
pub use bloom::BloomFilter;
pub use cost::{default_cost_fn, ByteLength, CostFn, DefaultCost, FixedWidth};
pub use coster::{CostPair, Coster};
pub use engine::{Cache, CacheBuilder, EvictFn};
pub use entry::{current_timestamp_ms, Entry};
pub use expiration::ExpirationIndex;
pub use hasher::{HashAlgorithm, KeyHasher};
pub use policy::{Admission, Policy};
pub use ring::{AccessSink, RingBuffer, RingPool};
pub use sketch::CountMinSketch;
pub use stats::{CacheStats, Metrics};
pub use store::{ShardedStore, Store, ANY_CONFLICT};
pub use tinylfu::TinyLfu;

// == Public Constants ==
/// Maximum allowed key length in bytes accepted by the HTTP front end
pub const MAX_KEY_LENGTH: usize = 256;
