//! BitSet Module
//!
//! Fixed-size bit array backing the bloom filter.

use crate::error::{CacheError, Result};

const WORD_BITS: u64 = 64;
const WORD_SHIFT: u64 = 6;
const WORD_MASK: u64 = WORD_BITS - 1;

// == Bit Set ==
/// Bit array over a power-of-two number of bits, stored as 64-bit words.
#[derive(Debug, Clone)]
pub struct BitSet {
    words: Vec<u64>,
    len: u64,
}

impl BitSet {
    // == Constructor ==
    /// Creates a zeroed bit set of `len` bits.
    ///
    /// Fails with `InvalidConfig` unless `len` is a power of two.
    pub fn new(len: u64) -> Result<Self> {
        if !len.is_power_of_two() {
            return Err(CacheError::InvalidConfig(format!(
                "bitset size {} must be a power of two",
                len
            )));
        }
        let words = (len + WORD_MASK) >> WORD_SHIFT;
        Ok(Self {
            words: vec![0; words as usize],
            len,
        })
    }

    // == Set ==
    /// Sets bit `index`. Panics if `index` is out of range.
    pub fn set(&mut self, index: u64) {
        assert!(index < self.len, "bit {} out of range {}", index, self.len);
        self.words[(index >> WORD_SHIFT) as usize] |= 1 << (index & WORD_MASK);
    }

    // == Has ==
    /// Tests bit `index`. Panics if `index` is out of range.
    pub fn has(&self, index: u64) -> bool {
        assert!(index < self.len, "bit {} out of range {}", index, self.len);
        (self.words[(index >> WORD_SHIFT) as usize] >> (index & WORD_MASK)) & 1 == 1
    }

    // == Reset ==
    /// Clears every bit.
    pub fn reset(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Number of addressable bits.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }
}
