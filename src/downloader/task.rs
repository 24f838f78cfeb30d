//! Per-task state: status transitions, byte counter, telemetry window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::telemetry::{self, SampleWindow};
use crate::types::{Status, TaskId, TaskSnapshot};

/// One registered download.
///
/// Status, filename, sizes and the error message change together under a
/// per-task lock. Once the status is terminal every later transition is
/// refused and the transferred count is frozen.
pub(crate) struct DownloadTask {
    pub(crate) id: TaskId,
    pub(crate) link: String,
    pub(crate) destination: String,
    pub(crate) started_at: DateTime<Utc>,
    /// Fires on cancel, shutdown or logout
    pub(crate) cancel_token: CancellationToken,
    /// Bytes streamed into the sink so far
    pub(crate) written: Arc<AtomicU64>,
    pub(crate) window: Arc<Mutex<SampleWindow>>,
    state: RwLock<TaskState>,
}

#[derive(Clone, Debug)]
struct TaskState {
    status: Status,
    filename: String,
    total_bytes: u64,
    // transferred count captured at the terminal transition
    final_bytes: Option<u64>,
    error: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskState {
    fn transferred(&self, written: u64) -> u64 {
        if let Some(bytes) = self.final_bytes {
            return bytes;
        }
        if self.total_bytes > 0 {
            written.min(self.total_bytes)
        } else {
            written
        }
    }
}

impl DownloadTask {
    pub(crate) fn new(
        id: TaskId,
        link: &str,
        destination: &str,
        cancel_token: CancellationToken,
        sample_window: usize,
    ) -> Self {
        Self {
            id,
            link: link.to_string(),
            destination: destination.to_string(),
            started_at: Utc::now(),
            cancel_token,
            written: Arc::new(AtomicU64::new(0)),
            window: Arc::new(Mutex::new(SampleWindow::new(sample_window))),
            state: RwLock::new(TaskState {
                status: Status::Pending,
                filename: String::new(),
                total_bytes: 0,
                final_bytes: None,
                error: None,
                finished_at: None,
            }),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TaskState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` unless the task is already terminal
    fn transition(&self, change: impl FnOnce(&mut TaskState, u64)) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.status.is_terminal() {
            return false;
        }
        let written = self.written.load(Ordering::Acquire);
        change(&mut state, written);
        true
    }

    /// Current status
    pub(crate) fn status(&self) -> Status {
        self.read().status
    }

    /// Resolved total size (0 until resolved)
    pub(crate) fn total_bytes(&self) -> u64 {
        self.read().total_bytes
    }

    /// Transferred bytes, clamped to the total once known
    pub(crate) fn transferred(&self) -> u64 {
        let written = self.written.load(Ordering::Acquire);
        self.read().transferred(written)
    }

    /// `pending` → `downloading`
    pub(crate) fn mark_downloading(&self) -> bool {
        let mut started = false;
        self.transition(|state, _| {
            if state.status == Status::Pending {
                state.status = Status::Downloading;
                started = true;
            }
        }) && started
    }

    /// Record the resolved filename and total size
    pub(crate) fn set_resolved(&self, filename: &str, total_bytes: u64) -> bool {
        self.transition(|state, _| {
            state.filename = filename.to_string();
            state.total_bytes = total_bytes;
        })
    }

    /// `completed` with transferred = total
    pub(crate) fn complete(&self) -> bool {
        self.transition(|state, _| {
            state.status = Status::Completed;
            state.final_bytes = Some(state.total_bytes);
            state.finished_at = Some(Utc::now());
        })
    }

    /// `error` with a message
    pub(crate) fn fail(&self, message: String) -> bool {
        self.transition(|state, written| {
            state.final_bytes = Some(state.transferred(written));
            state.status = Status::Error;
            state.error = Some(message);
        })
    }

    /// `cancelled`
    pub(crate) fn mark_cancelled(&self) -> bool {
        self.transition(|state, written| {
            state.final_bytes = Some(state.transferred(written));
            state.status = Status::Cancelled;
        })
    }

    /// Consistent point-in-time view
    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        let written = self.written.load(Ordering::Acquire);
        let state = self.read().clone();
        let transferred = state.transferred(written);

        let speed_bps = if state.status.is_terminal() {
            0.0
        } else {
            self.window
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .speed()
        };
        let remaining = state.total_bytes.saturating_sub(transferred);

        TaskSnapshot {
            id: self.id.clone(),
            link: self.link.clone(),
            destination: self.destination.clone(),
            filename: state.filename,
            status: state.status,
            downloaded_bytes: transferred,
            total_bytes: state.total_bytes,
            progress: telemetry::progress_percent(transferred, state.total_bytes),
            speed_bps,
            eta_secs: telemetry::eta(remaining, speed_bps).as_secs(),
            error: state.error,
            started_at: self.started_at,
            finished_at: state.finished_at,
        }
    }
}
