//! Download control: start, progress, list, cancel.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::link::parse_link;
use crate::types::{Event, TaskId, TaskSnapshot};

use super::{DownloadTask, Downloader};

impl Downloader {
    /// Start downloading the attachment behind `link` into `destination`.
    ///
    /// The link is parsed first; a malformed link is rejected without
    /// registering a task. Otherwise a `pending` task is registered, its
    /// execution is spawned and the new identity is returned immediately.
    /// Resolution and transfer failures are only observable through
    /// [`progress`](Self::progress) and events.
    ///
    /// An empty `destination` uses the configured default destination.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use teleturbo::*;
    /// # async fn example(downloader: Downloader) -> Result<()> {
    /// let id = downloader
    ///     .start("https://t.me/c/1234567890/123", "~/Downloads/TeleTurbo")
    ///     .await?;
    /// println!("started {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&self, link: &str, destination: &str) -> Result<TaskId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        let descriptor = parse_link(link)?;

        let destination = if destination.trim().is_empty() {
            self.config.download.default_destination.as_str()
        } else {
            destination
        };

        let id = TaskId::generate();
        let task = Arc::new(DownloadTask::new(
            id.clone(),
            link,
            destination,
            self.root_token.child_token(),
            self.config.telemetry.sample_window,
        ));

        self.registry.write().await.insert(id.clone(), task.clone());
        tracing::info!(task_id = %id, link, destination, "Download queued");
        self.emit_event(Event::Queued {
            id: id.clone(),
            link: link.to_string(),
        });

        self.spawn_task(task, descriptor);
        Ok(id)
    }

    /// Consistent snapshot of one task
    pub async fn progress(&self, id: &TaskId) -> Result<TaskSnapshot> {
        self.registry
            .read()
            .await
            .get(id)
            .map(|task| task.snapshot())
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    /// Snapshot of every registered task, in no particular order
    pub async fn list_all(&self) -> Vec<TaskSnapshot> {
        self.registry
            .read()
            .await
            .values()
            .map(|task| task.snapshot())
            .collect()
    }

    /// Cancel a task and forget it.
    ///
    /// Signals the task's cancellation (the engine aborts and the partial file
    /// is deleted), marks it `cancelled` and removes it from the registry, so
    /// later [`progress`](Self::progress) calls report not found. Other tasks
    /// are unaffected.
    pub async fn cancel(&self, id: &TaskId) -> Result<()> {
        let task = self
            .registry
            .write()
            .await
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        task.cancel_token.cancel();
        if task.mark_cancelled() {
            tracing::info!(task_id = %id, "Download cancelled");
            self.emit_event(Event::Cancelled { id: id.clone() });
        } else {
            tracing::debug!(task_id = %id, status = %task.status(), "Removed finished download");
        }
        Ok(())
    }
}
