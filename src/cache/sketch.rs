//! Count-Min Sketch Module
//!
//! Four rows of packed 4-bit saturating counters. Each row is addressed with
//! the key hash XORed against a per-row seed; the point estimate is the
//! minimum over the rows.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Number of rows in the sketch.
pub const SKETCH_DEPTH: usize = 4;
/// Largest value a 4-bit counter can hold.
pub const MAX_COUNTER: u8 = 0x0f;
/// Smallest counter count per row.
const MIN_WIDTH: u64 = 64;

// == Row ==
/// One row of counters, two per byte: low nibble for even indexes, high nibble for odd.
#[derive(Debug, Clone)]
struct Row(Vec<u8>);

impl Row {
    fn new(width: u64) -> Self {
        Row(vec![0; (width >> 1) as usize])
    }

    fn get(&self, index: u64) -> u8 {
        let shift = (index & 1) * 4;
        (self.0[(index >> 1) as usize] >> shift) & MAX_COUNTER
    }

    fn increment(&mut self, index: u64) {
        let shift = (index & 1) * 4;
        let byte = &mut self.0[(index >> 1) as usize];
        if (*byte >> shift) & MAX_COUNTER < MAX_COUNTER {
            *byte += 1 << shift;
        }
    }

    fn decay(&mut self) {
        // Shift both nibbles at once, then drop the bits that crossed from
        // the high nibble into the low one.
        for byte in self.0.iter_mut() {
            *byte = (*byte >> 2) & 0x33;
        }
    }

    fn reset(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

// == Count-Min Sketch ==
#[derive(Debug, Clone)]
pub struct CountMinSketch {
    rows: [Row; SKETCH_DEPTH],
    seeds: [u64; SKETCH_DEPTH],
    mask: u64,
}

impl CountMinSketch {
    // == Constructor ==
    /// Creates a sketch sized for `width` keys with seeds drawn from the thread RNG.
    pub fn new(width: u64) -> Self {
        Self::with_rng(width, &mut rand::rng())
    }

    /// Creates a sketch whose row seeds are derived from `seed`.
    pub fn with_seed(width: u64, seed: u64) -> Self {
        Self::with_rng(width, &mut StdRng::seed_from_u64(seed))
    }

    /// Creates a sketch drawing its row seeds from `rng`.
    ///
    /// `width` is rounded up to a power of two of at least 64.
    pub fn with_rng<R: RngCore + ?Sized>(width: u64, rng: &mut R) -> Self {
        let width = width.max(MIN_WIDTH).next_power_of_two();
        Self {
            rows: std::array::from_fn(|_| Row::new(width)),
            seeds: std::array::from_fn(|_| rng.next_u64()),
            mask: width - 1,
        }
    }

    fn index(&self, row: usize, hash: u64) -> u64 {
        (hash ^ self.seeds[row]) & self.mask
    }

    // == Increment ==
    pub fn increment(&mut self, hash: u64) {
        for row in 0..SKETCH_DEPTH {
            let index = self.index(row, hash);
            self.rows[row].increment(index);
        }
    }

    // == Estimate ==
    /// Minimum of the key's counters across all rows.
    pub fn estimate(&self, hash: u64) -> u8 {
        (0..SKETCH_DEPTH)
            .map(|row| self.rows[row].get(self.index(row, hash)))
            .min()
            .unwrap_or(0)
    }

    // == Decay ==
    /// Divides every counter by four.
    pub fn decay(&mut self) {
        self.rows.iter_mut().for_each(Row::decay);
    }

    // == Reset ==
    pub fn reset(&mut self) {
        self.rows.iter_mut().for_each(Row::reset);
    }

    /// Counters per row.
    pub fn width(&self) -> u64 {
        self.mask + 1
    }
}
