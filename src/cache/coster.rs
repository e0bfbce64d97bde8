//! Coster Module
//!
//! Capacity ledger: per-key cost plus the aggregate used/max budget.

use std::collections::HashMap;

/// Number of candidates drawn per eviction round.
pub const SAMPLE_COUNT: usize = 5;

/// A `(hash, cost)` pair taken from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostPair {
    pub hash: u64,
    pub cost: i64,
}

// == Coster ==
/// Invariant: `used == sum(entries)` and `used <= max` after every mutation.
#[derive(Debug, Clone)]
pub struct Coster {
    entries: HashMap<u64, i64>,
    used: i64,
    max: i64,
}

impl Coster {
    // == Constructor ==
    pub fn new(max: i64) -> Self {
        Self {
            entries: HashMap::new(),
            used: 0,
            max,
        }
    }

    // == Add ==
    /// Records `cost` for `hash`, replacing any earlier cost for it.
    ///
    /// Returns false, changing nothing, if the result does not fit.
    pub fn add(&mut self, hash: u64, cost: i64) -> bool {
        let previous = self.entries.get(&hash).copied().unwrap_or(0);
        let delta = cost - previous;
        if self.used + delta > self.max {
            return false;
        }
        self.entries.insert(hash, cost);
        self.used += delta;
        true
    }

    // == Update If Exists ==
    /// Replaces the cost of a resident key if the delta fits.
    ///
    /// Returns false when `hash` is absent or the new cost would overflow the budget.
    pub fn update_if_exists(&mut self, hash: u64, cost: i64) -> bool {
        let Some(previous) = self.entries.get(&hash).copied() else {
            return false;
        };
        let delta = cost - previous;
        if self.used + delta > self.max {
            return false;
        }
        self.entries.insert(hash, cost);
        self.used += delta;
        true
    }

    // == Remain ==
    /// Budget left after adding `cost`; negative means insufficient room.
    pub fn remain(&self, cost: i64) -> i64 {
        self.max - self.used - cost
    }

    // == Delete ==
    /// Removes `hash` and returns its cost, if it was recorded.
    pub fn del(&mut self, hash: u64) -> Option<i64> {
        let cost = self.entries.remove(&hash)?;
        self.used -= cost;
        Some(cost)
    }

    // == Fill Sample ==
    /// Appends ledger pairs in iteration order until `sample` holds `k` items
    /// or the ledger runs out. Hashes already in `sample` or in `skip` are passed over.
    pub fn fill_sample(&self, sample: &mut Vec<CostPair>, k: usize, skip: &[u64]) {
        if sample.len() >= k {
            return;
        }
        for (&hash, &cost) in &self.entries {
            if skip.contains(&hash) || sample.iter().any(|p| p.hash == hash) {
                continue;
            }
            sample.push(CostPair { hash, cost });
            if sample.len() >= k {
                return;
            }
        }
    }

    /// Cost recorded for `hash`.
    pub fn get(&self, hash: u64) -> Option<i64> {
        self.entries.get(&hash).copied()
    }

    /// Drops every entry and zeroes `used`.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
    }

    pub fn used(&self) -> i64 {
        self.used
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn sum(&self) -> i64 {
        self.entries.values().sum()
    }
}
