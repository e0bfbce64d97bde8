//! Cache Statistics Module
//!
//! Lock-free counters updated by the read path, the write pipeline and the
//! expiration sweep, plus a serializable point-in-time snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Metrics ==
/// Live counters shared by every cache handle.
#[derive(Debug, Default)]
pub struct Metrics {
    hits: AtomicU64,
    misses: AtomicU64,
    keys_added: AtomicU64,
    keys_updated: AtomicU64,
    keys_evicted: AtomicU64,
    keys_expired: AtomicU64,
    sets_dropped: AtomicU64,
    sets_rejected: AtomicU64,
}

macro_rules! recorders {
    ($($name:ident => $field:ident),* $(,)?) => {$(
        pub fn $name(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    )*};
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    recorders! {
        record_hit => hits,
        record_miss => misses,
        record_added => keys_added,
        record_updated => keys_updated,
        record_evicted => keys_evicted,
        record_expired => keys_expired,
        record_dropped => sets_dropped,
        record_rejected => sets_rejected,
    }

    /// Copies the counters into a snapshot.
    pub fn snapshot(&self, total_entries: usize, total_cost: i64, max_cost: i64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys_added: self.keys_added.load(Ordering::Relaxed),
            keys_updated: self.keys_updated.load(Ordering::Relaxed),
            keys_evicted: self.keys_evicted.load(Ordering::Relaxed),
            keys_expired: self.keys_expired.load(Ordering::Relaxed),
            sets_dropped: self.sets_dropped.load(Ordering::Relaxed),
            sets_rejected: self.sets_rejected.load(Ordering::Relaxed),
            total_entries,
            total_cost,
            max_cost,
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Successful lookups
    pub hits: u64,
    /// Lookups that found nothing, a foreign conflict hash or an expired entry
    pub misses: u64,
    /// Keys newly admitted
    pub keys_added: u64,
    /// Writes that replaced a resident key
    pub keys_updated: u64,
    /// Keys removed to make room
    pub keys_evicted: u64,
    /// Keys removed by the expiration sweep
    pub keys_expired: u64,
    /// Async writes dropped because the channel was full or closed
    pub sets_dropped: u64,
    /// Writes refused by admission or failed validation in the pipeline
    pub sets_rejected: u64,
    /// Entries currently stored
    pub total_entries: usize,
    /// Cost currently charged against the budget
    pub total_cost: i64,
    /// Total cost budget
    pub max_cost: i64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let stats = Metrics::new().snapshot(0, 0, 100);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.keys_evicted, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.max_cost, 100);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let metrics = Metrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        assert_eq!(metrics.snapshot(0, 0, 1).hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let metrics = Metrics::new();
        metrics.record_hit();
        metrics.record_miss();
        assert_eq!(metrics.snapshot(0, 0, 1).hit_rate(), 0.5);
    }

    #[test]
    fn test_each_recorder_hits_its_counter() {
        let metrics = Metrics::new();
        metrics.record_added();
        metrics.record_updated();
        metrics.record_evicted();
        metrics.record_evicted();
        metrics.record_expired();
        metrics.record_dropped();
        metrics.record_rejected();

        let stats = metrics.snapshot(3, 42, 100);
        assert_eq!(stats.keys_added, 1);
        assert_eq!(stats.keys_updated, 1);
        assert_eq!(stats.keys_evicted, 2);
        assert_eq!(stats.keys_expired, 1);
        assert_eq!(stats.sets_dropped, 1);
        assert_eq!(stats.sets_rejected, 1);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_cost, 42);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_string(&Metrics::new().snapshot(1, 2, 3)).unwrap();
        assert!(json.contains("\"keys_expired\":0"));
        assert!(json.contains("\"max_cost\":3"));
    }
}
