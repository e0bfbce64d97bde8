//! Policy Module
//!
//! Admission and eviction decisions. The policy owns the cost ledger and the
//! TinyLFU estimator behind one exclusive lock, so the background pipeline
//! and direct synchronous writers never race on either.

use parking_lot::Mutex;

use crate::cache::coster::{CostPair, Coster, SAMPLE_COUNT};
use crate::cache::tinylfu::TinyLfu;
use crate::error::{CacheError, Result};

// == Admission ==
/// Outcome of one `Policy::put`.
///
/// Evicted hashes are already gone from the ledger but not from the store;
/// the caller removes them and fires the eviction callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Keys removed from the ledger to make room
    pub evicted: Vec<u64>,
    /// The key was newly admitted
    pub admitted: bool,
    /// The key was already resident and keeps its slot under the new cost
    pub resident: bool,
}

impl Admission {
    fn rejected() -> Self {
        Self::default()
    }

    fn admitted(evicted: Vec<u64>) -> Self {
        Self {
            evicted,
            admitted: true,
            resident: false,
        }
    }

    fn resident() -> Self {
        Self {
            resident: true,
            ..Self::default()
        }
    }

    /// Whether the caller should write the value into the store.
    pub fn should_store(&self) -> bool {
        self.admitted || self.resident
    }
}

struct PolicyInner {
    coster: Coster,
    lfu: TinyLfu,
}

// == Policy ==
pub struct Policy {
    inner: Mutex<PolicyInner>,
}

impl Policy {
    // == Constructor ==
    /// Creates a policy with budget `max_cost` and a sketch sized for `max_keys`.
    pub fn new(max_keys: u64, max_cost: i64) -> Result<Self> {
        Self::with_lfu(TinyLfu::new(max_keys)?, max_cost)
    }

    /// Same as `new` with deterministic sketch seeds.
    pub fn with_seed(max_keys: u64, max_cost: i64, seed: u64) -> Result<Self> {
        Self::with_lfu(TinyLfu::with_seed(max_keys, seed)?, max_cost)
    }

    fn with_lfu(lfu: TinyLfu, max_cost: i64) -> Result<Self> {
        if max_cost <= 0 {
            return Err(CacheError::InvalidConfig(
                "max_cost must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            inner: Mutex::new(PolicyInner {
                coster: Coster::new(max_cost),
                lfu,
            }),
        })
    }

    // == Put ==
    /// Decides whether `hash` with `cost` may occupy the budget.
    ///
    /// A rejected put leaves the ledger exactly as it was: victims are only
    /// removed once the incoming key is known to be admitted.
    pub fn put(&self, hash: u64, cost: i64) -> Result<Admission> {
        let mut inner = self.inner.lock();

        let max = inner.coster.max();
        if cost >= max {
            return Err(CacheError::CostTooLarge { cost, max });
        }

        if let Some(previous) = inner.coster.get(hash) {
            if inner.coster.update_if_exists(hash, cost) {
                return Ok(Admission::resident());
            }
            // The larger cost only fits after evicting others
            inner.coster.del(hash);
            let admission = inner.admit(hash, cost);
            if !admission.admitted {
                inner.coster.add(hash, previous);
                return Ok(admission);
            }
            return Ok(Admission {
                evicted: admission.evicted,
                admitted: false,
                resident: true,
            });
        }

        Ok(inner.admit(hash, cost))
    }

    // == Push Access ==
    /// Feeds a batch of read hashes into the frequency estimator.
    ///
    /// Never waits for the policy lock: if a writer holds it the batch is
    /// dropped and false is returned.
    pub fn push_access(&self, keys: &[u64]) -> bool {
        if keys.is_empty() {
            return true;
        }
        match self.inner.try_lock() {
            Some(mut inner) => {
                inner.lfu.bulk_increment(keys);
                true
            }
            None => false,
        }
    }

    // == Delete ==
    /// Removes `hash` from the ledger, returning its cost.
    pub fn del(&self, hash: u64) -> Option<i64> {
        self.inner.lock().coster.del(hash)
    }

    /// Recorded cost of `hash`.
    pub fn cost_of(&self, hash: u64) -> Option<i64> {
        self.inner.lock().coster.get(hash)
    }

    /// Current frequency estimate of `hash`.
    pub fn estimate(&self, hash: u64) -> u64 {
        self.inner.lock().lfu.estimate(hash)
    }

    pub fn used(&self) -> i64 {
        self.inner.lock().coster.used()
    }

    pub fn max_cost(&self) -> i64 {
        self.inner.lock().coster.max()
    }

    /// Number of keys in the ledger.
    pub fn len(&self) -> usize {
        self.inner.lock().coster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the ledger and starts a new frequency epoch.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.coster.clear();
        inner.lfu.reset();
    }
}

impl PolicyInner {
    fn admit(&mut self, hash: u64, cost: i64) -> Admission {
        if self.coster.remain(cost) > 0 {
            self.coster.add(hash, cost);
            return Admission::admitted(Vec::new());
        }

        let incoming = self.lfu.estimate(hash);
        let mut sample: Vec<CostPair> = Vec::with_capacity(SAMPLE_COUNT);
        let mut victims: Vec<u64> = Vec::new();
        let mut freed = 0i64;

        while self.coster.remain(cost) + freed < 0 {
            self.coster.fill_sample(&mut sample, SAMPLE_COUNT, &victims);
            let Some((index, min_freq)) = self.min_sample(&sample) else {
                return Admission::rejected();
            };
            // A colder newcomer never displaces a hotter resident
            if incoming < min_freq {
                return Admission::rejected();
            }
            let victim = sample.swap_remove(index);
            freed += victim.cost;
            victims.push(victim.hash);
        }

        for &victim in &victims {
            self.coster.del(victim);
        }
        self.coster.add(hash, cost);
        Admission::admitted(victims)
    }

    /// Index and estimate of the coldest sampled pair, first one on ties.
    fn min_sample(&self, sample: &[CostPair]) -> Option<(usize, u64)> {
        let mut min: Option<(usize, u64)> = None;
        for (i, pair) in sample.iter().enumerate() {
            let freq = self.lfu.estimate(pair.hash);
            if min.map_or(true, |(_, m)| freq < m) {
                min = Some((i, freq));
            }
        }
        min
    }
}
