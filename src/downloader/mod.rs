//! Download task manager split into focused submodules.
//!
//! The [`Downloader`] struct and its methods are organized by domain:
//! - [`control`] - Start, progress, list and cancel
//! - [`orchestration`] - The per-task execution routine
//! - [`lifecycle`] - Shutdown coordination
//! - [`task`] - Per-task state and transitions

mod control;
mod lifecycle;
mod orchestration;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::engine::DownloadEngine;
use crate::error::Result;
use crate::session::Session;
use crate::types::{Event, TaskId};

pub(crate) use task::DownloadTask;

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Registry mapping task identity to task state
pub(crate) type Registry = Arc<RwLock<HashMap<TaskId, Arc<DownloadTask>>>>;

/// Task manager (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Downloader {
    /// Session whose capability resolves links
    pub(crate) session: Session,
    /// External transfer engine
    pub(crate) engine: Arc<dyn DownloadEngine>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Registered tasks, including terminal ones until cancelled
    pub(crate) registry: Registry,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Parent of every task's cancellation signal, derived from the session's
    pub(crate) root_token: CancellationToken,
    /// Running execution routines
    pub(crate) routines: TaskTracker,
    /// Cleared by shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl Downloader {
    /// Create a task manager over `session` and `engine`.
    ///
    /// Fails when `config` does not validate.
    pub fn new(session: Session, engine: Arc<dyn DownloadEngine>, config: Config) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let root_token = session.shutdown_token().child_token();

        Ok(Self {
            session,
            engine,
            config: Arc::new(config),
            registry: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            root_token,
            routines: TaskTracker::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to download events.
    ///
    /// Events are delivered best-effort: a slow subscriber that falls more
    /// than the channel capacity behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Session this manager downloads through
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send an event; having no subscribers is not an error
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
