//! Expiration Index Module
//!
//! Groups keys into coarse time buckets so a sweep only touches the keys
//! whose bucket has fully elapsed. Shared by all shards behind one lock.
//!
//! A key expiring at Unix second `t` lives in bucket `t / interval + 1`; the
//! sweep at time `now` drains buckets up to `now / interval`, all of which
//! lie entirely in the past.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

/// Keys of one bucket, primary hash to conflict hash.
pub type Bucket = HashMap<u64, u64>;

// == Expiration Index ==
#[derive(Debug)]
pub struct ExpirationIndex {
    buckets: Mutex<BTreeMap<u64, Bucket>>,
    interval_secs: u64,
}

impl ExpirationIndex {
    // == Constructor ==
    /// Creates an index with buckets `interval_secs` wide (minimum one second).
    pub fn new(interval_secs: u64) -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            interval_secs: interval_secs.max(1),
        }
    }

    /// Bucket holding keys that expire at `expires_at` (Unix milliseconds).
    pub fn storage_bucket(&self, expires_at: u64) -> u64 {
        expires_at / 1000 / self.interval_secs + 1
    }

    /// Newest bucket that is entirely in the past at `now` (Unix milliseconds).
    pub fn clean_bucket(&self, now: u64) -> u64 {
        self.storage_bucket(now) - 1
    }

    // == Put ==
    pub fn put(&self, key: u64, conflict: u64, expires_at: Option<u64>) {
        let Some(expires_at) = expires_at else {
            return;
        };
        let mut buckets = self.buckets.lock();
        self.insert(&mut buckets, key, conflict, expires_at);
    }

    fn insert(&self, buckets: &mut BTreeMap<u64, Bucket>, key: u64, conflict: u64, expires_at: u64) {
        buckets
            .entry(self.storage_bucket(expires_at))
            .or_default()
            .insert(key, conflict);
    }

    // == Get ==
    /// Conflict token recorded for `key` in the bucket of `expires_at`.
    pub fn get(&self, key: u64, expires_at: Option<u64>) -> Option<u64> {
        let expires_at = expires_at?;
        let buckets = self.buckets.lock();
        buckets
            .get(&self.storage_bucket(expires_at))
            .and_then(|bucket| bucket.get(&key).copied())
    }

    // == Delete ==
    pub fn del(&self, key: u64, expires_at: Option<u64>) {
        let Some(expires_at) = expires_at else {
            return;
        };
        let mut buckets = self.buckets.lock();
        let index = self.storage_bucket(expires_at);
        if let Some(bucket) = buckets.get_mut(&index) {
            bucket.remove(&key);
            if bucket.is_empty() {
                buckets.remove(&index);
            }
        }
    }

    // == Update ==
    /// Moves `key` from its old bucket to the bucket of `new_expires_at`.
    ///
    /// The old slot is only vacated when its recorded token is `old_conflict`;
    /// a different token belongs to a colliding key and is left alone.
    pub fn update(
        &self,
        key: u64,
        old_conflict: u64,
        old_expires_at: Option<u64>,
        new_conflict: u64,
        new_expires_at: Option<u64>,
    ) {
        let mut buckets = self.buckets.lock();
        if let Some(old) = old_expires_at {
            let index = self.storage_bucket(old);
            if let Some(bucket) = buckets.get_mut(&index) {
                if bucket.get(&key) == Some(&old_conflict) {
                    bucket.remove(&key);
                    if bucket.is_empty() {
                        buckets.remove(&index);
                    }
                }
            }
        }
        if let Some(new) = new_expires_at {
            self.insert(&mut buckets, key, new_conflict, new);
        }
    }

    // == Take Expired ==
    /// Detaches and returns every bucket that has fully elapsed at `now`.
    pub fn take_expired(&self, now: u64) -> Vec<Bucket> {
        let clean = self.clean_bucket(now);
        let mut buckets = self.buckets.lock();
        let pending = buckets.split_off(&(clean + 1));
        let expired = std::mem::replace(&mut *buckets, pending);
        expired.into_values().collect()
    }

    /// Number of non-empty buckets.
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.buckets.lock().clear();
    }
}
