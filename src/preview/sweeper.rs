//! Periodic reclamation of idle and dead previews.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::registry::PreviewRegistry;

/// Background task that stops previews which are idle past their timeout or
/// whose process has exited on its own.
pub struct Sweeper {
    registry: Arc<PreviewRegistry>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(registry: Arc<PreviewRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run one sweep and return how many previews were reclaimed.
    ///
    /// Candidates are collected first and stopped afterwards, one at a time.
    /// Each one is re-checked under the registry lock before it is stopped.
    pub async fn sweep_once(&self) -> usize {
        let candidates = self.registry.reclaimable().await;
        let mut reclaimed = 0;

        for business_id in candidates {
            if self.registry.stop_if_reclaimable(&business_id).await {
                tracing::info!(business_id = %business_id, "Cleaned up expired preview server");
                reclaimed += 1;
            } else {
                tracing::debug!(business_id = %business_id, "Preview removed or revived before sweep reached it");
            }
        }

        if reclaimed > 0 {
            tracing::info!(reclaimed, "Sweep finished");
        }
        reclaimed
    }

    /// Spawn the sweep loop. Cancelling `cancel` interrupts the wait between
    /// sweeps immediately; a sweep already in progress runs to completion.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run(self, cancel: CancellationToken) {
        tracing::debug!(interval_secs = self.interval.as_secs_f64(), "Sweeper started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            self.sweep_once().await;
        }
        tracing::debug!("Sweeper stopped");
    }
}
