//! Cache Engine Module
//!
//! The public façade. Reads go straight to the sharded store and leave an
//! access record in a pooled ring buffer; writes are either queued on a
//! bounded channel drained by one background task, or applied inline by the
//! `*_sync` variants.
//!
//! # Ordering
//! Queued writes to one key are applied in the order they were accepted.
//! A `*_sync` write and a queued write to the same key carry no ordering
//! guarantee between them: whichever reaches the store last wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::cost::{default_cost_fn, CostFn, DefaultCost};
use crate::cache::entry::{current_timestamp_ms, Entry};
use crate::cache::hasher::KeyHasher;
use crate::cache::policy::Policy;
use crate::cache::ring::RingPool;
use crate::cache::stats::{CacheStats, Metrics};
use crate::cache::store::{ShardedStore, Store, ANY_CONFLICT};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_write_pipeline;

/// Callback fired for every evicted or expired entry: `(key, conflict, value, cost)`.
pub type EvictFn<V> = Arc<dyn Fn(u64, u64, &V, i64) + Send + Sync>;

// == Cache Core ==
/// State shared by the façade and the write pipeline.
///
/// Every mutation that touches both the ledger and the store runs under
/// `write_lock`, so the two never disagree about which keys are resident.
/// Reads take only the shard lock.
pub(crate) struct CacheCore<V> {
    pub(crate) config: Config,
    policy: Arc<Policy>,
    store: Box<dyn Store<V>>,
    cost_fn: CostFn<V>,
    on_evict: Option<EvictFn<V>>,
    metrics: Metrics,
    write_lock: Mutex<()>,
}

impl<V: Send + Sync + 'static> CacheCore<V> {
    // == Apply ==
    /// Runs one write through admission and into the store.
    ///
    /// A zero cost is replaced by the cost function's verdict. Victims chosen
    /// by the policy are force-deleted from the store before the new value
    /// lands.
    pub(crate) fn apply(&self, mut entry: Entry<V>) -> Result<()> {
        if entry.cost == 0 {
            entry.cost = (self.cost_fn)(&entry.value);
        }
        if entry.cost < 0 {
            return Err(self.reject(CacheError::InvalidRequest(format!(
                "cost function returned negative cost {}",
                entry.cost
            ))));
        }

        let _writer = self.write_lock.lock();
        let admission = match self.policy.put(entry.key, entry.cost) {
            Ok(admission) => admission,
            Err(err) => return Err(self.reject(err)),
        };

        for &victim in &admission.evicted {
            if let Some(evicted) = self.store.del(victim, ANY_CONFLICT) {
                self.metrics.record_evicted();
                self.notify(&evicted);
            }
        }

        if !admission.should_store() {
            return Err(self.reject(CacheError::Rejected));
        }
        if admission.resident {
            self.metrics.record_updated();
        } else {
            self.metrics.record_added();
        }
        self.store.put(entry);
        Ok(())
    }

    // == Sweep ==
    /// Drops every entry whose expiration bucket has elapsed at `now`.
    pub(crate) fn sweep(&self, now: u64) -> usize {
        let _writer = self.write_lock.lock();
        self.store.clean(now, &mut |entry| {
            self.policy.del(entry.key);
            self.metrics.record_expired();
            self.notify(&entry);
        })
    }

    // == Remove ==
    /// Drops `hash` from the store and the ledger. No eviction callback fires.
    pub(crate) fn remove(&self, hash: u64, conflict: u64) -> bool {
        let _writer = self.write_lock.lock();
        match self.store.del(hash, conflict) {
            Some(_) => {
                self.policy.del(hash);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&self) {
        let _writer = self.write_lock.lock();
        self.store.clear();
        self.policy.clear();
    }

    fn notify(&self, entry: &Entry<V>) {
        if let Some(on_evict) = &self.on_evict {
            on_evict(entry.key, entry.conflict, &entry.value, entry.cost);
        }
    }

    fn reject(&self, err: CacheError) -> CacheError {
        self.metrics.record_rejected();
        if self.config.log {
            warn!(error = %err, "write not applied");
        }
        err
    }
}

struct Inner<V> {
    core: Arc<CacheCore<V>>,
    ring: RingPool,
    tx: mpsc::Sender<Entry<V>>,
    closed: AtomicBool,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

// == Cache ==
/// Cost-bounded, TinyLFU-admitted cache handle. Clones share one cache.
pub struct Cache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Cache<V>
where
    V: DefaultCost + Clone + Send + Sync + 'static,
{
    /// Builds a cache that sizes values with their default cost.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        CacheBuilder::new(config).build()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Put ==
    /// Queues a write without expiration. See `put_with_ttl`.
    pub fn put(&self, key: impl AsRef<[u8]>, value: V, cost: i64) -> bool {
        self.put_with_ttl(key, value, cost, Duration::ZERO)
    }

    /// Queues a write for the background pipeline.
    ///
    /// Returns false when the key is empty, `cost` is negative, the cache is
    /// closed or the write channel is full. `true` only means the write was
    /// accepted; admission is decided later and failures there surface only
    /// through stats and logging.
    ///
    /// # Arguments
    /// * `cost` - Charge against the budget, 0 to use the cost function
    /// * `ttl` - Time to live, zero for no expiration
    pub fn put_with_ttl(&self, key: impl AsRef<[u8]>, value: V, cost: i64, ttl: Duration) -> bool {
        let entry = match self.prepare(key.as_ref(), value, cost, ttl) {
            Ok(entry) => entry,
            Err(_) => return false,
        };
        if self.is_closed() {
            self.inner.core.metrics.record_dropped();
            return false;
        }
        match self.inner.tx.try_send(entry) {
            Ok(()) => true,
            Err(_) => {
                self.inner.core.metrics.record_dropped();
                false
            }
        }
    }

    /// Applies a write without expiration inline. See `put_with_ttl_sync`.
    pub fn put_sync(&self, key: impl AsRef<[u8]>, value: V, cost: i64) -> Result<()> {
        self.put_with_ttl_sync(key, value, cost, Duration::ZERO)
    }

    /// Applies a write on the calling task, bypassing the channel.
    ///
    /// Returns `Rejected` when admission refuses the key and `CostTooLarge`
    /// when the item alone exceeds the budget.
    pub fn put_with_ttl_sync(
        &self,
        key: impl AsRef<[u8]>,
        value: V,
        cost: i64,
        ttl: Duration,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }
        let entry = self.prepare(key.as_ref(), value, cost, ttl)?;
        self.inner.core.apply(entry)
    }

    fn prepare(&self, key: &[u8], value: V, cost: i64, ttl: Duration) -> Result<Entry<V>> {
        let core = &self.inner.core;
        if key.is_empty() {
            return Err(core.reject(CacheError::InvalidRequest(
                "key cannot be empty".to_string(),
            )));
        }
        if cost < 0 {
            return Err(core.reject(CacheError::InvalidRequest(format!(
                "cost {} must not be negative",
                cost
            ))));
        }
        let (hash, conflict) = core.config.hash.hash(key);
        Ok(Entry::new(hash, conflict, value, cost, ttl))
    }

    // == Get ==
    /// Returns the live value of `key`, if any.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<V> {
        self.lookup(key).ok()
    }

    /// Like `get`, but tells a missing key apart from an expired one.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Result<V> {
        let core = &self.inner.core;
        let (hash, conflict) = core.config.hash.hash(key.as_ref());
        if core.config.record_reads {
            self.inner.ring.put(hash);
        }
        let result = core.store.get(hash, conflict);
        match result {
            Ok(_) => core.metrics.record_hit(),
            Err(_) => core.metrics.record_miss(),
        }
        result
    }

    // == Delete ==
    /// Removes `key` from the store and the budget. No eviction callback fires.
    pub fn del(&self, key: impl AsRef<[u8]>) -> bool {
        let core = &self.inner.core;
        let (hash, conflict) = core.config.hash.hash(key.as_ref());
        core.remove(hash, conflict)
    }

    /// Drops every entry and resets the frequency estimator.
    ///
    /// Writes still queued when this runs are applied afterwards.
    pub fn clear(&self) {
        self.inner.core.clear();
        debug!("cache cleared");
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let core = &self.inner.core;
        core.metrics
            .snapshot(core.store.len(), core.policy.used(), core.policy.max_cost())
    }

    pub fn len(&self) -> usize {
        self.inner.core.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs an expiration sweep now instead of waiting for the ticker.
    pub fn sweep(&self) -> usize {
        self.inner.core.sweep(current_timestamp_ms())
    }
}

impl<V> Cache<V> {
    // == Close ==
    /// Stops the write pipeline. Queued writes not yet dequeued are
    /// discarded; later writes are refused. Calling it again does nothing.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(tx) = self.inner.shutdown.lock().take() {
            let _ = tx.send(());
        }
        info!("cache closed");
    }

    /// Closes the cache and waits for the pipeline task to exit.
    pub async fn shutdown(&self) {
        self.close();
        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                warn!(error = %err, "write pipeline ended abnormally");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

// == Cache Builder ==
/// Assembles a `Cache` from a `Config`, a cost function and an optional
/// eviction callback.
pub struct CacheBuilder<V> {
    config: Config,
    cost_fn: CostFn<V>,
    on_evict: Option<EvictFn<V>>,
    seed: Option<u64>,
}

impl<V: DefaultCost + 'static> CacheBuilder<V> {
    pub fn new(config: Config) -> Self {
        Self::with_cost_fn(config, default_cost_fn::<V>())
    }
}

impl<V: 'static> CacheBuilder<V> {
    /// Builder whose zero-cost writes are priced by `cost_fn`.
    pub fn with_cost_fn(config: Config, cost_fn: CostFn<V>) -> Self {
        Self {
            config,
            cost_fn,
            on_evict: None,
            seed: None,
        }
    }

    /// Called for every evicted or expired entry while the cache's write lock
    /// is held. Must not block or write to the cache.
    pub fn on_evict<F>(mut self, on_evict: F) -> Self
    where
        F: Fn(u64, u64, &V, i64) + Send + Sync + 'static,
    {
        self.on_evict = Some(Arc::new(on_evict));
        self
    }

    /// Fixes the frequency sketch seeds.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    // == Build ==
    /// Validates the config, allocates the policy and store, and spawns the
    /// write pipeline on the current tokio runtime.
    pub fn build(self) -> Result<Cache<V>>
    where
        V: Clone + Send + Sync,
    {
        let config = self.config;
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            CacheError::InvalidConfig("cache must be built inside a tokio runtime".to_string())
        })?;

        let max_keys = config.max_key_count();
        let policy = Arc::new(match self.seed {
            Some(seed) => Policy::with_seed(max_keys, config.max_cost, seed)?,
            None => Policy::new(max_keys, config.max_cost)?,
        });
        let store = ShardedStore::new(config.shards, config.bucket_interval)?;
        let ring = RingPool::new(policy.clone(), config.access_buffer_size);
        let (tx, rx) = mpsc::channel(config.write_buffer_size);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(
            max_cost = config.max_cost,
            max_keys,
            shards = config.shards,
            hash = config.hash.name(),
            "cache initialized"
        );

        let core = Arc::new(CacheCore {
            config,
            policy,
            store: Box::new(store),
            cost_fn: self.cost_fn,
            on_evict: self.on_evict,
            metrics: Metrics::new(),
            write_lock: Mutex::new(()),
        });
        let worker = spawn_write_pipeline(&runtime, core.clone(), rx, shutdown_rx);

        Ok(Cache {
            inner: Arc::new(Inner {
                core,
                ring,
                tx,
                closed: AtomicBool::new(false),
                shutdown: Mutex::new(Some(shutdown_tx)),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }
}
