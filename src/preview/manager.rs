use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::registry::PreviewRegistry;
use super::sweeper::Sweeper;

struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Application-level lifecycle for previews.
///
/// `start` once at startup, `shutdown` once before exit. Shutdown must finish
/// before the process exits or preview servers are left orphaned.
pub struct PreviewManager {
    registry: Arc<PreviewRegistry>,
    sweep_interval: Duration,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl PreviewManager {
    pub fn new(registry: Arc<PreviewRegistry>, sweep_interval: Duration) -> Self {
        Self {
            registry,
            sweep_interval,
            sweeper: Mutex::new(None),
        }
    }

    /// Spawn the sweeper. Calling it again while running is a no-op.
    pub async fn start(&self) {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let task = Sweeper::new(Arc::clone(&self.registry), self.sweep_interval).spawn(cancel.clone());
        *sweeper = Some(SweeperHandle { cancel, task });
        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Preview server manager started"
        );
    }

    /// Cancel the sweeper, then stop every remaining preview.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.cancel.cancel();
            if let Err(e) = handle.task.await {
                tracing::error!(error = %e, "Sweeper task failed");
            }
        }
        let stopped = self.registry.stop_all().await;
        tracing::info!(stopped, "Preview server manager stopped");
    }

    pub async fn is_started(&self) -> bool {
        self.sweeper.lock().await.is_some()
    }
}
