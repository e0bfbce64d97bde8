//! Integration Tests for the Cache Façade
//!
//! Drives the public `Cache` API end to end: both write paths, reads,
//! expiration, eviction and shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tinycache::cache::{CostFn, KeyHasher};
use tinycache::{Cache, CacheBuilder, CacheError, Config, HashAlgorithm};
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

fn small_config(max_cost: i64) -> Config {
    Config {
        shards: 16,
        bucket_interval: 1,
        ..Config::with_max_cost(max_cost)
    }
}

/// Polls until `key` is readable or the deadline passes.
async fn wait_for(cache: &Cache<String>, key: &str) -> Option<String> {
    for _ in 0..100 {
        if let Some(value) = cache.get(key) {
            return Some(value);
        }
        sleep(Duration::from_millis(10)).await;
    }
    None
}

// == Sync Write Path ==

#[tokio::test]
async fn test_end_to_end_ttl() {
    let config = Config {
        avg_cost: 100,
        ..Config::with_max_cost(1_000_000)
    };
    let cache: Cache<String> = Cache::new(config).unwrap();

    assert_ok!(cache.put_with_ttl_sync("a", "1".to_string(), 0, Duration::from_secs(10)));
    assert_eq!(cache.get("a"), Some("1".to_string()));

    assert_ok!(cache.put_with_ttl_sync("b", "2".to_string(), 0, Duration::from_millis(1)));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get("b"), None);
}

#[tokio::test]
async fn test_hash_algorithms_agree_on_behavior() {
    for hash in [HashAlgorithm::FnvXx, HashAlgorithm::Xxh3Fnv] {
        let config = Config {
            hash,
            ..small_config(1000)
        };
        let cache: Cache<String> = Cache::new(config).unwrap();
        assert_ok!(cache.put_sync("key", "value".to_string(), 0));
        assert_eq!(cache.get("key"), Some("value".to_string()));
        assert_eq!(cache.get("other"), None);
    }
}

#[tokio::test]
async fn test_custom_cost_function() {
    let cost_fn: CostFn<Vec<u32>> = Arc::new(|v: &Vec<u32>| (v.len() * 4) as i64);
    let cache = CacheBuilder::with_cost_fn(small_config(1000), cost_fn)
        .build()
        .unwrap();

    assert_ok!(cache.put_sync("nums", vec![1, 2, 3], 0));
    assert_eq!(cache.stats().total_cost, 12);

    // An explicit cost wins over the cost function
    assert_ok!(cache.put_sync("nums", vec![1, 2, 3], 2));
    assert_eq!(cache.stats().total_cost, 2);
}

#[tokio::test]
async fn test_negative_cost_from_cost_function_is_rejected() {
    let cost_fn: CostFn<String> = Arc::new(|_: &String| -1);
    let cache = CacheBuilder::with_cost_fn(small_config(1000), cost_fn)
        .build()
        .unwrap();

    let err = assert_err!(cache.put_sync("k", "v".to_string(), 0));
    assert!(matches!(err, CacheError::InvalidRequest(_)));
    assert_eq!(cache.get("k"), None);
    assert_eq!(cache.stats().sets_rejected, 1);
}

// == Async Write Path ==

#[tokio::test]
async fn test_async_put_is_applied_by_pipeline() {
    let cache: Cache<String> = Cache::new(small_config(1000)).unwrap();

    assert!(cache.put("a", "1".to_string(), 0));
    assert!(cache.put_with_ttl("b", "2".to_string(), 0, Duration::from_secs(60)));

    assert_eq!(wait_for(&cache, "a").await, Some("1".to_string()));
    assert_eq!(wait_for(&cache, "b").await, Some("2".to_string()));
    assert_eq!(cache.stats().keys_added, 2);
}

#[tokio::test]
async fn test_async_writes_to_one_key_apply_in_order() {
    let cache: Cache<String> = Cache::new(small_config(1000)).unwrap();

    for i in 0..20 {
        assert!(cache.put("k", format!("v{}", i), 1));
    }
    assert!(cache.put("done", "x".to_string(), 1));
    assert!(wait_for(&cache, "done").await.is_some());

    assert_eq!(cache.get("k"), Some("v19".to_string()));
}

#[tokio::test]
async fn test_async_put_reports_backpressure() {
    let config = Config {
        write_buffer_size: 1,
        ..small_config(1000)
    };
    let cache: Cache<String> = Cache::new(config).unwrap();

    // The current-thread runtime cannot drain while this loop runs
    let accepted = (0..10)
        .filter(|i| cache.put(format!("k{}", i), "v".to_string(), 1))
        .count();

    assert_eq!(accepted, 1);
    assert_eq!(cache.stats().sets_dropped, 9);
}

#[tokio::test]
async fn test_async_cost_too_large_is_only_observable_in_stats() {
    let cache: Cache<String> = Cache::new(small_config(100)).unwrap();

    // Accepted for queueing; the pipeline refuses it later
    assert!(cache.put("big", "v".to_string(), 500));
    assert!(cache.put("marker", "v".to_string(), 1));
    assert!(wait_for(&cache, "marker").await.is_some());

    assert_eq!(cache.get("big"), None);
    assert_eq!(cache.stats().sets_rejected, 1);
}

// == Eviction ==

#[tokio::test]
async fn test_hot_keys_survive_cold_newcomers() {
    let evicted = Arc::new(AtomicUsize::new(0));
    let counter = evicted.clone();
    let config = Config {
        access_buffer_size: 1,
        ..small_config(10)
    };
    let cache = CacheBuilder::<String>::new(config)
        .seed(42)
        .on_evict(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    for i in 0..10 {
        assert_ok!(cache.put_sync(format!("hot{}", i), "v".to_string(), 1));
    }
    // Every read is flushed straight to the sketch
    for i in 0..10 {
        assert!(cache.get(format!("hot{}", i)).is_some());
    }

    assert_eq!(
        cache.put_sync("cold", "v".to_string(), 1),
        Err(CacheError::Rejected)
    );
    assert_eq!(evicted.load(Ordering::SeqCst), 0);
    assert_eq!(cache.len(), 10);
    assert_eq!(cache.get("cold"), None);
}

#[tokio::test]
async fn test_eviction_callback_reports_evicted_entry() {
    let seen: Arc<parking_lot::Mutex<Vec<(u64, u64, String, i64)>>> = Arc::default();
    let sink = seen.clone();
    let cache = CacheBuilder::<String>::new(small_config(10))
        .seed(3)
        .on_evict(move |key, conflict, value, cost| {
            sink.lock().push((key, conflict, value.clone(), cost));
        })
        .build()
        .unwrap();

    for i in 0..5 {
        assert_ok!(cache.put_sync(format!("k{}", i), format!("value{}", i), 2));
    }
    assert_ok!(cache.put_sync("new", "fresh".to_string(), 2));

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let (key, conflict, value, cost) = &seen[0];
    assert_eq!(*cost, 2);

    let index: usize = value["value".len()..].parse().unwrap();
    let expected = HashAlgorithm::FnvXx.hash(format!("k{}", index).as_bytes());
    assert_eq!((*key, *conflict), expected);
    assert_eq!(cache.get(format!("k{}", index)), None);
    assert_eq!(cache.get("new"), Some("fresh".to_string()));
}

// == Expiration ==

#[tokio::test]
async fn test_background_sweep_removes_expired_keys() {
    let expired = Arc::new(AtomicUsize::new(0));
    let counter = expired.clone();
    let cache = CacheBuilder::<String>::new(small_config(1000))
        .on_evict(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    assert_ok!(cache.put_with_ttl_sync("short", "v".to_string(), 0, Duration::from_millis(10)));
    assert_ok!(cache.put_with_ttl_sync("long", "v".to_string(), 0, Duration::from_secs(3600)));

    // Bucket width is one second and the ticker fires every half second
    sleep(Duration::from_millis(3000)).await;

    assert_eq!(expired.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().keys_expired, 1);
    assert_eq!(cache.stats().total_cost, 1);
}

// == Shutdown ==

#[tokio::test]
async fn test_close_stops_writes_but_not_reads() {
    let cache: Cache<String> = Cache::new(small_config(1000)).unwrap();
    assert_ok!(cache.put_sync("k", "v".to_string(), 0));

    cache.close();
    cache.close();

    assert!(!cache.put("x", "v".to_string(), 0));
    assert_eq!(cache.put_sync("x", "v".to_string(), 0), Err(CacheError::Closed));
    assert_eq!(cache.get("k"), Some("v".to_string()));

    cache.shutdown().await;
    cache.shutdown().await;
}

#[tokio::test]
async fn test_clones_share_state() {
    let cache: Cache<String> = Cache::new(small_config(1000)).unwrap();
    let other = cache.clone();

    assert_ok!(other.put_sync("shared", "yes".to_string(), 0));
    assert_eq!(cache.get("shared"), Some("yes".to_string()));

    other.close();
    assert!(cache.is_closed());
}
