//! Write Pipeline Task
//!
//! The single consumer of the pending-write channel. It applies queued
//! writes in arrival order and runs the expiration sweep every half bucket
//! interval, until the cache is closed or every handle is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::engine::CacheCore;
use crate::cache::entry::{current_timestamp_ms, Entry};

/// Spawns the write pipeline on `runtime`.
///
/// # Arguments
/// * `core` - Shared policy, store and metrics
/// * `rx` - Receiving half of the pending-write channel
/// * `shutdown` - Fires once when the cache is closed
///
/// # Returns
/// A JoinHandle that resolves once the loop has exited.
pub(crate) fn spawn_write_pipeline<V>(
    runtime: &Handle,
    core: Arc<CacheCore<V>>,
    mut rx: mpsc::Receiver<Entry<V>>,
    mut shutdown: oneshot::Receiver<()>,
) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    let period = sweep_period(core.config.bucket_interval);

    runtime.spawn(async move {
        info!("Starting write pipeline, sweeping every {:?}", period);
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    // Refuse anything still in flight; queued items are dropped with rx
                    rx.close();
                    break;
                }
                item = rx.recv() => match item {
                    // Failures are counted and logged inside apply
                    Some(entry) => {
                        let _ = core.apply(entry);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    let removed = core.sweep(current_timestamp_ms());
                    if removed > 0 {
                        debug!("Expiration sweep removed {} entries", removed);
                    }
                }
            }
        }

        info!("Write pipeline stopped");
    })
}

/// Half the bucket interval, never below 100ms.
fn sweep_period(bucket_interval_secs: u64) -> Duration {
    Duration::from_millis((bucket_interval_secs.saturating_mul(1000) / 2).max(100))
}
