//! Key Hashing Module
//!
//! Every key is reduced to a `(key, conflict)` pair of independent 64-bit
//! hashes. Only the pair is stored; the key bytes are never retained.

use xxhash_rust::xxh3::xxh3_64;
use xxhash_rust::xxh64::xxh64;

// FNV-1a parameters, see https://en.wikipedia.org/wiki/Fowler–Noll–Vo_hash_function
const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// Seed for the xxh64 secondary hash.
const XXH64_SEED: u64 = 0;

/// Produces the primary and conflict hashes of a key.
pub trait KeyHasher: Send + Sync {
    fn hash(&self, key: &[u8]) -> (u64, u64);
}

/// Key hashing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// FNV-1a primary, xxh64 conflict
    #[default]
    FnvXx,
    /// xxh3 primary, FNV-1a conflict
    Xxh3Fnv,
}

impl HashAlgorithm {
    /// Algorithm name as accepted by `parse`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FnvXx => "fnv-xx",
            Self::Xxh3Fnv => "xxh3-fnv",
        }
    }

    /// Parses an algorithm name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fnv-xx" | "fnvxx" => Some(Self::FnvXx),
            "xxh3-fnv" | "xxh3fnv" => Some(Self::Xxh3Fnv),
            _ => None,
        }
    }
}

impl KeyHasher for HashAlgorithm {
    fn hash(&self, key: &[u8]) -> (u64, u64) {
        match self {
            Self::FnvXx => (fnv1a(key), xxh64(key, XXH64_SEED)),
            Self::Xxh3Fnv => (xxh3_64(key), fnv1a(key)),
        }
    }
}

/// 64-bit FNV-1a.
#[inline]
pub fn fnv1a(key: &[u8]) -> u64 {
    key.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}
