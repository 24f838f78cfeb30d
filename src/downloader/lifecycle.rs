//! Shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::types::Event;

use super::Downloader;

/// How long shutdown waits for execution routines to wind down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Downloader {
    /// Cancel every registered task and wait for their routines to exit.
    ///
    /// Running tasks end `cancelled` (their partial files are removed) and
    /// stay listed; finished tasks keep their status. New downloads are
    /// refused with [`Error::ShuttingDown`](crate::Error::ShuttingDown)
    /// afterwards.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating downloader shutdown");
        self.accepting_new.store(false, Ordering::SeqCst);

        let cancelled = self.cancel_all().await;
        tracing::info!(cancelled, "Signaled cancellation to all active downloads");

        self.routines.close();
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.routines.wait()).await {
            Ok(()) => tracing::info!("All download routines finished"),
            Err(_) => tracing::warn!(
                remaining = self.routines.len(),
                "Timeout waiting for download routines, proceeding with shutdown"
            ),
        }
    }

    /// Number of execution routines still running
    pub fn active_count(&self) -> usize {
        self.routines.len()
    }

    async fn cancel_all(&self) -> usize {
        self.root_token.cancel();

        let registry = self.registry.read().await;
        let mut cancelled = 0;
        for task in registry.values() {
            if task.mark_cancelled() {
                cancelled += 1;
                tracing::debug!(task_id = %task.id, "Cancelled during shutdown");
                self.emit_event(Event::Cancelled {
                    id: task.id.clone(),
                });
            }
        }
        cancelled
    }
}
