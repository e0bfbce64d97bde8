//! Cache Store Module
//!
//! Sharded key/value storage with a shared bucketed expiration index.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cache::entry::Entry;
use crate::cache::expiration::ExpirationIndex;
use crate::error::{CacheError, Result};

/// Conflict value that matches any stored entry on delete.
pub const ANY_CONFLICT: u64 = 0;

// == Store Trait ==
/// Storage contract the cache façade drives.
///
/// The store knows nothing of costs or admission; it holds whatever the
/// policy has let in and reports what expired.
pub trait Store<V>: Send + Sync {
    /// Inserts or wholesale replaces the entry for `entry.key`.
    fn put(&self, entry: Entry<V>);

    /// Looks up a live value, guarding against primary-hash collisions.
    fn get(&self, key: u64, conflict: u64) -> Result<V>;

    /// Removes and returns an entry. `ANY_CONFLICT` skips the collision check.
    fn del(&self, key: u64, conflict: u64) -> Option<Entry<V>>;

    /// Removes entries from every fully elapsed expiration bucket, handing each to `on_expire`.
    fn clean(&self, now: u64, on_expire: &mut dyn FnMut(Entry<V>)) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

type Shard<V> = RwLock<HashMap<u64, Entry<V>>>;

// == Sharded Store ==
pub struct ShardedStore<V> {
    shards: Vec<Shard<V>>,
    mask: u64,
    expiration: ExpirationIndex,
}

impl<V> ShardedStore<V> {
    // == Constructor ==
    /// Creates a store with `shards` shards (a power of two) and expiration
    /// buckets `bucket_interval` seconds wide.
    pub fn new(shards: usize, bucket_interval: u64) -> Result<Self> {
        if !shards.is_power_of_two() {
            return Err(CacheError::InvalidConfig(format!(
                "shard count {} must be a power of two",
                shards
            )));
        }
        Ok(Self {
            shards: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
            mask: shards as u64 - 1,
            expiration: ExpirationIndex::new(bucket_interval),
        })
    }

    fn shard(&self, key: u64) -> &Shard<V> {
        &self.shards[(key & self.mask) as usize]
    }

    /// Expiration bookkeeping, exposed for inspection.
    pub fn expiration(&self) -> &ExpirationIndex {
        &self.expiration
    }
}

impl<V: Clone + Send + Sync> Store<V> for ShardedStore<V> {
    fn put(&self, entry: Entry<V>) {
        let mut shard = self.shard(entry.key).write();
        match shard.get(&entry.key) {
            None => self
                .expiration
                .put(entry.key, entry.conflict, entry.expires_at),
            Some(old) => self.expiration.update(
                entry.key,
                old.conflict,
                old.expires_at,
                entry.conflict,
                entry.expires_at,
            ),
        }
        shard.insert(entry.key, entry);
    }

    fn get(&self, key: u64, conflict: u64) -> Result<V> {
        let shard = self.shard(key).read();
        match shard.get(&key) {
            Some(entry) if entry.conflict == conflict => {
                if entry.is_expired() {
                    Err(CacheError::Expired)
                } else {
                    Ok(entry.value.clone())
                }
            }
            _ => Err(CacheError::NotFound),
        }
    }

    fn del(&self, key: u64, conflict: u64) -> Option<Entry<V>> {
        let mut shard = self.shard(key).write();
        let entry = shard.get(&key)?;
        if conflict != ANY_CONFLICT && entry.conflict != conflict {
            return None;
        }
        let entry = shard.remove(&key)?;
        self.expiration
            .update(key, entry.conflict, entry.expires_at, entry.conflict, None);
        Some(entry)
    }

    fn clean(&self, now: u64, on_expire: &mut dyn FnMut(Entry<V>)) -> usize {
        let mut removed = 0;
        for bucket in self.expiration.take_expired(now) {
            for (key, conflict) in bucket {
                let expired = {
                    let mut shard = self.shard(key).write();
                    let due = matches!(
                        shard.get(&key),
                        Some(e) if e.conflict == conflict && e.is_expired_at(now)
                    );
                    if due {
                        shard.remove(&key)
                    } else {
                        None
                    }
                };
                if let Some(entry) = expired {
                    removed += 1;
                    on_expire(entry);
                }
            }
        }
        removed
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    fn clear(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
        self.expiration.clear();
    }
}
