//! Shell-facing facade.
//!
//! [`TeleTurbo`] is what a UI or CLI shell talks to. It owns at most one
//! [`Session`] and the [`Downloader`] bound to it, and answers every call
//! with a plain token (`"CODE_SENT"`, `"CLIENT_INITIALIZED"`, a task id, ...)
//! or an `"ERROR: <message>"` string, so the shell never has to match on
//! Rust error types.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::downloader::Downloader;
use crate::engine::DownloadEngine;
use crate::error::Error;
use crate::rpc::Connector;
use crate::session::{LoginStatus, Session, SessionState};
use crate::types::{SystemInfo, TaskId, TaskSnapshot};
use crate::utils::system_info;

/// Token returned by a successful [`TeleTurbo::initialize_session`]
pub const CLIENT_INITIALIZED: &str = "CLIENT_INITIALIZED";
/// Token returned by a successful [`TeleTurbo::cancel_download`]
pub const CANCELLED: &str = "CANCELLED";
/// Token returned by a successful [`TeleTurbo::logout`]
pub const LOGGED_OUT: &str = "LOGGED_OUT";

const NOT_INITIALIZED: &str = "Client not initialized";

/// Format any error the way shells expect it
pub fn error_token(message: impl std::fmt::Display) -> String {
    format!("ERROR: {message}")
}

struct Client {
    session: Session,
    downloader: Downloader,
}

/// Facade over one session and its task manager
pub struct TeleTurbo {
    config: Config,
    engine: Arc<dyn DownloadEngine>,
    client: RwLock<Option<Client>>,
    // Covers the states where no session exists yet (Connecting, Failed)
    phase: Mutex<SessionState>,
}

impl TeleTurbo {
    /// Create an uninitialized facade that will download through `engine`
    pub fn new(config: Config, engine: Arc<dyn DownloadEngine>) -> Self {
        Self {
            config,
            engine,
            client: RwLock::new(None),
            phase: Mutex::new(SessionState::Uninitialized),
        }
    }

    /// Open a session through `connector`.
    ///
    /// Returns [`CLIENT_INITIALIZED`] on success. A previously initialized
    /// session is shut down and replaced.
    pub async fn initialize_session(
        &self,
        connector: Arc<dyn Connector>,
        app_id: i32,
        app_hash: &str,
    ) -> String {
        let mut client = self.client.write().await;
        if let Some(previous) = client.take() {
            tracing::info!("Replacing existing session");
            previous.downloader.shutdown().await;
        }
        self.set_phase(SessionState::Connecting);

        let session =
            match Session::initialize(connector, app_id, app_hash, self.config.session.clone())
                .await
            {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to initialize session");
                    self.set_phase(SessionState::Failed);
                    return error_token(e);
                }
            };

        let downloader =
            match Downloader::new(session.clone(), self.engine.clone(), self.config.clone()) {
                Ok(downloader) => downloader,
                Err(e) => {
                    self.set_phase(SessionState::Failed);
                    return error_token(e);
                }
            };

        tracing::info!(state = %session.state(), "Client initialized");
        *client = Some(Client {
            session,
            downloader,
        });
        self.set_phase(SessionState::Uninitialized);
        CLIENT_INITIALIZED.to_string()
    }

    /// Current session state, including `Connecting` while initialization runs
    pub fn state(&self) -> SessionState {
        match self.client.try_read() {
            Ok(client) => match client.as_ref() {
                Some(c) => c.session.state(),
                None => self.phase(),
            },
            Err(_) => self.phase(),
        }
    }

    /// Request a login code for `phone`
    pub async fn start_login(&self, phone: &str) -> String {
        match self.session().await {
            Some(session) => login_token(session.start_login(phone).await),
            None => error_token(NOT_INITIALIZED),
        }
    }

    /// Submit the code received for the pending login
    pub async fn submit_code(&self, code: &str) -> String {
        match self.session().await {
            Some(session) => login_token(session.submit_code(code).await),
            None => error_token(NOT_INITIALIZED),
        }
    }

    /// Submit the account's 2FA password
    pub async fn submit_password(&self, password: &str) -> String {
        match self.session().await {
            Some(session) => login_token(session.submit_password(password).await),
            None => error_token(NOT_INITIALIZED),
        }
    }

    /// Non-blocking; false while no session exists or one is being set up
    pub fn is_authenticated(&self) -> bool {
        match self.client.try_read() {
            Ok(client) => client
                .as_ref()
                .is_some_and(|c| c.session.is_authenticated()),
            Err(_) => false,
        }
    }

    /// Start a download and return its task id
    pub async fn start_download(&self, link: &str, destination: &str) -> String {
        let Some(downloader) = self.downloader().await else {
            return error_token(NOT_INITIALIZED);
        };
        match downloader.start(link, destination).await {
            Ok(id) => id.to_string(),
            Err(e) => error_token(e),
        }
    }

    /// Snapshot of one task as JSON, or `{"error": ...}`
    pub async fn get_progress(&self, id: &str) -> serde_json::Value {
        let Some(downloader) = self.downloader().await else {
            return json!({ "error": NOT_INITIALIZED });
        };
        let snapshot = downloader.progress(&TaskId::from(id)).await;
        match snapshot.and_then(|s| serde_json::to_value(s).map_err(Error::from)) {
            Ok(value) => value,
            Err(e) => json!({ "error": e.to_string(), "code": e.error_code() }),
        }
    }

    /// Snapshots of every registered task (empty before initialization)
    pub async fn list_downloads(&self) -> Vec<TaskSnapshot> {
        match self.downloader().await {
            Some(downloader) => downloader.list_all().await,
            None => Vec::new(),
        }
    }

    /// Cancel a task; returns [`CANCELLED`]
    pub async fn cancel_download(&self, id: &str) -> String {
        let Some(downloader) = self.downloader().await else {
            return error_token(NOT_INITIALIZED);
        };
        match downloader.cancel(&TaskId::from(id)).await {
            Ok(()) => CANCELLED.to_string(),
            Err(e) => error_token(e),
        }
    }

    /// Host information and the concurrency degree downloads would use
    pub fn get_system_info(&self) -> SystemInfo {
        system_info(&self.config.download)
    }

    /// Cancel every download, log out and forget the session.
    ///
    /// The facade is uninitialized afterwards even when the remote call fails.
    pub async fn logout(&self) -> String {
        let Some(client) = self.client.write().await.take() else {
            return error_token(NOT_INITIALIZED);
        };
        client.downloader.shutdown().await;
        match client.session.logout().await {
            Ok(()) => LOGGED_OUT.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Remote logout failed");
                error_token(e)
            }
        }
    }

    async fn session(&self) -> Option<Session> {
        self.client.read().await.as_ref().map(|c| c.session.clone())
    }

    async fn downloader(&self) -> Option<Downloader> {
        self.client
            .read()
            .await
            .as_ref()
            .map(|c| c.downloader.clone())
    }

    fn phase(&self) -> SessionState {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, state: SessionState) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl std::fmt::Debug for TeleTurbo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeleTurbo")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn login_token(result: Result<LoginStatus, crate::error::AuthError>) -> String {
    match result {
        Ok(status) => status.as_token().to_string(),
        Err(e) => error_token(e),
    }
}
