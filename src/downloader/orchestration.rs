//! Per-task execution routine: resolve, prepare destination, transfer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use crate::engine::CountingWriter;
use crate::error::{EngineError, ResolveError};
use crate::link::LinkDescriptor;
use crate::resolver::Resolver;
use crate::rpc::{RemoteApi, RemoteFileReference};
use crate::telemetry::{SamplerParams, spawn_sampler};
use crate::types::Event;
use crate::utils::{available_parallelism, concurrency_degree, expand_home, safe_file_name};

use super::{DownloadTask, Downloader};

impl Downloader {
    /// Spawn the execution routine for a freshly registered task
    pub(crate) fn spawn_task(&self, task: Arc<DownloadTask>, descriptor: LinkDescriptor) {
        let downloader = self.clone();
        self.routines.spawn(async move {
            downloader.run_task(task, descriptor).await;
        });
    }

    async fn run_task(&self, task: Arc<DownloadTask>, descriptor: LinkDescriptor) {
        if !task.mark_downloading() {
            return;
        }

        // Sampler stops with the task's signal or when this routine returns
        let sampler_token = task.cancel_token.child_token();
        let _sampler_guard = sampler_token.clone().drop_guard();
        let progress_task = task.clone();
        spawn_sampler(SamplerParams {
            id: task.id.clone(),
            interval: self.config.telemetry.sample_interval,
            window: task.window.clone(),
            progress: move || (progress_task.transferred(), progress_task.total_bytes()),
            event_tx: self.event_tx.clone(),
            cancel_token: sampler_token,
        });

        let resolved = tokio::select! {
            biased;
            _ = task.cancel_token.cancelled() => {
                self.finish_cancelled(&task, None).await;
                return;
            }
            resolved = self.resolve(&descriptor) => resolved,
        };
        let (api, file) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                self.finish_failed(&task, e.to_string());
                return;
            }
        };

        let filename = safe_file_name(&file.filename);
        if !task.set_resolved(&filename, file.size) {
            return;
        }
        tracing::info!(
            task_id = %task.id,
            filename = %filename,
            total_bytes = file.size,
            "Resolved download"
        );
        self.emit_event(Event::Resolved {
            id: task.id.clone(),
            filename: filename.clone(),
            total_bytes: file.size,
        });

        let dir = match self.prepare_destination(&task.destination).await {
            Ok(dir) => dir,
            Err(message) => {
                self.finish_failed(&task, message);
                return;
            }
        };
        let path = dir.join(&filename);

        if let Ok(meta) = tokio::fs::metadata(&path).await
            && meta.is_file()
            && meta.len() == file.size
        {
            tracing::info!(
                task_id = %task.id,
                path = %path.display(),
                "File already present with matching size, skipping transfer"
            );
            self.finish_completed(&task, path, true);
            return;
        }

        let threads = concurrency_degree(available_parallelism(), &self.config.download);
        tracing::info!(task_id = %task.id, threads, path = %path.display(), "Starting transfer");

        match self.transfer(&task, api, &file, &path, threads).await {
            Ok(()) => self.finish_completed(&task, path, false),
            Err(e) if matches!(e, EngineError::Cancelled) || task.cancel_token.is_cancelled() => {
                self.finish_cancelled(&task, Some(&path)).await;
            }
            Err(e) => self.finish_failed(&task, e.to_string()),
        }
    }

    async fn resolve(
        &self,
        descriptor: &LinkDescriptor,
    ) -> Result<(Arc<dyn RemoteApi>, RemoteFileReference), ResolveError> {
        let resolver = Resolver::for_session(&self.session, &self.config.download)?;
        let file = resolver.resolve(descriptor).await?;
        Ok((resolver.api().clone(), file))
    }

    /// Expand and create the destination directory
    async fn prepare_destination(&self, destination: &str) -> Result<PathBuf, String> {
        let dir = expand_home(destination)
            .map_err(|e| format!("failed to expand destination '{destination}': {e}"))?;
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            format!("failed to create directory '{}': {e}", dir.display())
        })?;
        Ok(dir)
    }

    async fn transfer(
        &self,
        task: &DownloadTask,
        api: Arc<dyn RemoteApi>,
        file: &RemoteFileReference,
        path: &Path,
        threads: usize,
    ) -> Result<(), EngineError> {
        let out = tokio::fs::File::create(path).await.map_err(|e| {
            EngineError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create file '{}': {e}", path.display()),
            ))
        })?;
        let mut sink = CountingWriter::new(out, task.written.clone());

        self.engine
            .stream(api, file, threads, &mut sink, task.cancel_token.clone())
            .await?;
        sink.flush().await?;
        Ok(())
    }

    fn finish_completed(&self, task: &DownloadTask, path: PathBuf, skipped: bool) {
        if task.complete() {
            tracing::info!(task_id = %task.id, path = %path.display(), skipped, "Download completed");
            self.emit_event(Event::Completed {
                id: task.id.clone(),
                path,
                skipped,
            });
        }
    }

    fn finish_failed(&self, task: &DownloadTask, message: String) {
        if task.fail(message.clone()) {
            tracing::warn!(task_id = %task.id, error = %message, "Download failed");
            self.emit_event(Event::Failed {
                id: task.id.clone(),
                error: message,
            });
        }
    }

    /// Mark cancelled and delete the partial file, if one was started
    async fn finish_cancelled(&self, task: &DownloadTask, partial: Option<&Path>) {
        if let Some(path) = partial {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    tracing::debug!(task_id = %task.id, path = %path.display(), "Removed partial file");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        task_id = %task.id,
                        path = %path.display(),
                        error = %e,
                        "Failed to remove partial file"
                    );
                }
            }
        }
        if task.mark_cancelled() {
            tracing::info!(task_id = %task.id, "Download cancelled");
            self.emit_event(Event::Cancelled {
                id: task.id.clone(),
            });
        }
    }
}
