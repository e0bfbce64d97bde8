//! TinyLFU Module
//!
//! Bounded-memory frequency estimator combining a bloom filter doorkeeper and
//! a count-min sketch. Estimates are only a relative priority signal.

use crate::cache::bloom::BloomFilter;
use crate::cache::sketch::CountMinSketch;
use crate::error::Result;

/// Target false-positive rate of the doorkeeper.
const DOORKEEPER_RATE: f64 = 0.01;

// == TinyLFU ==
#[derive(Debug, Clone)]
pub struct TinyLfu {
    sketch: CountMinSketch,
    doorkeeper: BloomFilter,
    /// First sightings allowed before the whole structure is reset
    reset_at: u64,
    /// First sightings in the current epoch
    observed: u64,
}

impl TinyLfu {
    // == Constructor ==
    /// Creates an estimator sized for `max_keys` distinct keys per epoch.
    pub fn new(max_keys: u64) -> Result<Self> {
        Self::from_sketch(max_keys, CountMinSketch::new(max_keys))
    }

    /// Same as `new` but with deterministic sketch seeds.
    pub fn with_seed(max_keys: u64, seed: u64) -> Result<Self> {
        Self::from_sketch(max_keys, CountMinSketch::with_seed(max_keys, seed))
    }

    fn from_sketch(max_keys: u64, sketch: CountMinSketch) -> Result<Self> {
        let max_keys = max_keys.max(1);
        Ok(Self {
            sketch,
            doorkeeper: BloomFilter::with_rate(max_keys, DOORKEEPER_RATE)?,
            reset_at: max_keys,
            observed: 0,
        })
    }

    // == Increment ==
    /// Records one access. Only a first sighting in the epoch reaches the sketch.
    pub fn increment(&mut self, hash: u64) {
        if self.doorkeeper.add_if_not_exist(hash) {
            self.sketch.increment(hash);
            self.observed += 1;
            if self.observed >= self.reset_at {
                self.reset();
            }
        }
    }

    /// Records a batch of accesses.
    pub fn bulk_increment(&mut self, hashes: &[u64]) {
        for &hash in hashes {
            self.increment(hash);
        }
    }

    // == Estimate ==
    /// Zero for keys the doorkeeper has not seen this epoch, else the sketch estimate.
    pub fn estimate(&self, hash: u64) -> u64 {
        if !self.doorkeeper.exist(hash) {
            return 0;
        }
        u64::from(self.sketch.estimate(hash))
    }

    // == Reset ==
    /// Clears doorkeeper and sketch together, starting a new epoch.
    pub fn reset(&mut self) {
        self.sketch.reset();
        self.doorkeeper.reset();
        self.observed = 0;
    }
}
