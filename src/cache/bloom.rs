//! Bloom Filter Module
//!
//! Probabilistic "seen before" set used by TinyLFU as its doorkeeper.
//!
//! One 64-bit hash yields every probe position through enhanced double
//! hashing: the hash is split into a high and a low half and probe `i` lands
//! on `(high + i * low) & mask`.

use std::f64::consts::LN_2;

use crate::cache::bitset::BitSet;
use crate::error::{CacheError, Result};

/// Smallest bit array the filter will allocate.
const MIN_BITS: u64 = 512;

// == Bloom Filter ==
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: BitSet,
    mask: u64,
    shift: u32,
    rounds: u64,
}

impl BloomFilter {
    // == Constructor ==
    /// Creates a filter from `entries` and a second parameter.
    ///
    /// When `param < 1` it is a target false-positive rate and both the bit
    /// count and the number of probe rounds are derived from it. Otherwise
    /// `param` is the number of rounds and `entries` the raw bit count.
    pub fn new(entries: f64, param: f64) -> Result<Self> {
        if entries <= 0.0 || param <= 0.0 || !entries.is_finite() || !param.is_finite() {
            return Err(CacheError::InvalidConfig(format!(
                "bloom filter parameters must be positive (entries {}, param {})",
                entries, param
            )));
        }

        let (size, rounds) = if param < 1.0 {
            size_for_rate(entries, param)
        } else {
            (entries.ceil() as u64, param.ceil() as u64)
        };

        let (size, exponent) = round_size(size).ok_or_else(|| {
            CacheError::InvalidConfig(format!(
                "bloom filter parameters overflow the bit array (entries {}, param {})",
                entries, param
            ))
        })?;
        if size <= 1 {
            return Err(CacheError::InvalidConfig(format!(
                "bloom filter size {} is too small",
                size
            )));
        }

        Ok(Self {
            bits: BitSet::new(size)?,
            mask: size - 1,
            shift: 64 - exponent,
            rounds: rounds.max(1),
        })
    }

    /// Creates a filter for `entries` keys at false-positive rate `rate`.
    pub fn with_rate(entries: u64, rate: f64) -> Result<Self> {
        if rate >= 1.0 {
            return Err(CacheError::InvalidConfig(format!(
                "false positive rate {} must be below 1",
                rate
            )));
        }
        Self::new(entries as f64, rate)
    }

    fn high_low(&self, hash: u64) -> (u64, u64) {
        (hash >> self.shift, (hash << self.shift) >> self.shift)
    }

    fn positions(&self, hash: u64) -> impl Iterator<Item = u64> + '_ {
        let (high, low) = self.high_low(hash);
        (0..self.rounds).map(move |i| high.wrapping_add(i.wrapping_mul(low)) & self.mask)
    }

    // == Exist ==
    /// True iff every probe bit for `hash` is set.
    pub fn exist(&self, hash: u64) -> bool {
        self.positions(hash).all(|i| self.bits.has(i))
    }

    // == Add ==
    pub fn add(&mut self, hash: u64) {
        let (high, low) = self.high_low(hash);
        for i in 0..self.rounds {
            self.bits.set(high.wrapping_add(i.wrapping_mul(low)) & self.mask);
        }
    }

    // == Add If Not Exist ==
    /// Adds `hash` and returns true if it was not already present.
    pub fn add_if_not_exist(&mut self, hash: u64) -> bool {
        if self.exist(hash) {
            return false;
        }
        self.add(hash);
        true
    }

    // == Reset ==
    pub fn reset(&mut self) {
        self.bits.reset();
    }

    /// Size of the underlying bit array.
    pub fn bit_len(&self) -> u64 {
        self.bits.len()
    }

    /// Probe positions per key.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

/// Optimal bit count and round count for `entries` keys at rate `p`.
fn size_for_rate(entries: f64, p: f64) -> (u64, u64) {
    let size = (-entries * p.ln() / (LN_2 * LN_2)).ceil();
    let rounds = (LN_2 * size / entries).ceil();
    (size as u64, rounds as u64)
}

/// Next power of two at or above `max(size, MIN_BITS)` plus its log2.
/// None when no such `u64` exists.
fn round_size(size: u64) -> Option<(u64, u32)> {
    let size = size.max(MIN_BITS).checked_next_power_of_two()?;
    Some((size, size.trailing_zeros()))
}
