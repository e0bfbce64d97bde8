//! Access Ring Buffer Module
//!
//! Batches read-access hashes and hands full batches to the policy, keeping
//! sketch writes off the read path. Buffers live in a free-list pool and are
//! checked out for a single `put`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::policy::Policy;

// == Access Sink ==
/// Receiver of flushed access batches.
pub trait AccessSink: Send + Sync {
    /// Consumes a batch; returns false if it was dropped.
    fn push_access(&self, keys: &[u64]) -> bool;
}

impl AccessSink for Policy {
    fn push_access(&self, keys: &[u64]) -> bool {
        Policy::push_access(self, keys)
    }
}

// == Ring Buffer ==
pub struct RingBuffer {
    sink: Arc<dyn AccessSink>,
    data: Vec<u64>,
    max_size: usize,
}

impl RingBuffer {
    pub fn new(sink: Arc<dyn AccessSink>, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            sink,
            data: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Appends `hash`, flushing to the sink once the buffer is full.
    pub fn put(&mut self, hash: u64) {
        self.data.push(hash);
        if self.data.len() >= self.max_size {
            self.sink.push_access(&self.data);
            self.data.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// == Ring Pool ==
/// Free-list of reusable ring buffers.
pub struct RingPool {
    free: Mutex<Vec<RingBuffer>>,
    sink: Arc<dyn AccessSink>,
    max_size: usize,
}

impl RingPool {
    pub fn new(sink: Arc<dyn AccessSink>, max_size: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            sink,
            max_size,
        }
    }

    /// Records one access through a pooled buffer.
    pub fn put(&self, hash: u64) {
        let mut buffer = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| RingBuffer::new(Arc::clone(&self.sink), self.max_size));
        buffer.put(hash);
        self.free.lock().push(buffer);
    }

    /// Buffers currently parked in the pool.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}
