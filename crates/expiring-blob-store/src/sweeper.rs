//! Periodic eviction task

use crate::store::ExpiringBlobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shortest interval the sweep loop will run at
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// How often to sweep and how old a record may get
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSchedule {
    pub interval: Duration,
    pub ttl: Duration,
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Background task that calls [`ExpiringBlobStore::evict_expired`] on a
/// fixed interval until stopped.
pub struct Sweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep loop. The first sweep runs one interval after start.
    ///
    /// Intervals shorter than [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn start(store: Arc<ExpiringBlobStore>, schedule: SweepSchedule) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let interval = schedule.interval.max(MIN_SWEEP_INTERVAL);
        if interval != schedule.interval {
            warn!(
                requested_ms = schedule.interval.as_millis() as u64,
                "Sweep interval too short, using the minimum"
            );
        }

        info!(
            interval_secs = interval.as_secs(),
            ttl_secs = schedule.ttl.as_secs(),
            "Starting blob sweeper"
        );

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.evict_expired(Instant::now(), schedule.ttl).await;
                        debug!(removed, "Sweep finished");
                    }
                }
            }
        });

        Self { cancel, handle }
    }

    /// Cancel the loop and wait for it to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Blob sweeper task ended abnormally");
        }
        info!("Blob sweeper stopped");
    }
}
