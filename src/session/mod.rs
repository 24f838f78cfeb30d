//! Session client: connection lifecycle and the login state machine.
//!
//! A [`Session`] owns one long-lived connection loop (driven by a
//! [`Connector`] on its own task) and the call capability that loop hands
//! back once ready. Login operations live in [`login`]; the 2FA proof in
//! [`srp`].
//!
//! Authentication state and the login scratch fields (phone number, code
//! verification token) sit behind a dedicated read/write lock. The lock is
//! never held across an `.await`.

mod login;
mod srp;

pub use login::LoginStatus;

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::error::{AuthError, InitError, InvocationError, ResolveError};
use crate::rpc::{ConnectParams, Connector, RemoteApi};

/// Externally visible session state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No connection (never initialized, or logged out)
    Uninitialized,
    /// Initialization in progress
    Connecting,
    /// Connected, not authenticated
    Ready,
    /// A code was requested and is awaited
    AwaitingCode,
    /// The account requires its 2FA password
    AwaitingPassword,
    /// Authenticated; downloads may be started
    Authenticated,
    /// Initialization failed; re-initialize to retry
    Failed,
}

impl SessionState {
    /// Upper-case name as shown to shells
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "UNINITIALIZED",
            SessionState::Connecting => "CONNECTING",
            SessionState::Ready => "READY",
            SessionState::AwaitingCode => "AWAITING_CODE",
            SessionState::AwaitingPassword => "AWAITING_PASSWORD",
            SessionState::Authenticated => "AUTHENTICATED",
            SessionState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login state with the scratch data valid only in that state
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LoginState {
    Ready,
    AwaitingCode {
        phone: String,
        phone_code_hash: String,
    },
    AwaitingPassword,
    Authenticated,
    LoggedOut,
}

impl LoginState {
    fn public(&self) -> SessionState {
        match self {
            LoginState::Ready => SessionState::Ready,
            LoginState::AwaitingCode { .. } => SessionState::AwaitingCode,
            LoginState::AwaitingPassword => SessionState::AwaitingPassword,
            LoginState::Authenticated => SessionState::Authenticated,
            LoginState::LoggedOut => SessionState::Uninitialized,
        }
    }
}

/// Connected session (cloneable, all clones share one connection)
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api_id: i32,
    api_hash: String,
    config: SessionConfig,
    api: Arc<dyn RemoteApi>,
    login: RwLock<LoginState>,
    shutdown: CancellationToken,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Session {
    /// Open the connection and restore any persisted session material.
    ///
    /// Spawns `connector` on a dedicated task and blocks until it reports
    /// ready, fails, or `connect_timeout` elapses. On timeout the connection
    /// loop is told to shut down before the error is returned. When the
    /// restored material is already authorized the session starts out
    /// authenticated.
    pub async fn initialize(
        connector: Arc<dyn Connector>,
        api_id: i32,
        api_hash: &str,
        config: SessionConfig,
    ) -> Result<Self, InitError> {
        tokio::fs::create_dir_all(&config.session_dir).await?;

        let params = ConnectParams {
            api_id,
            api_hash: api_hash.to_string(),
            session_path: config.session_path(),
        };
        let shutdown = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        tracing::info!(
            api_id,
            session_path = %params.session_path.display(),
            "Starting connection loop"
        );

        let loop_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            let result = connector.run(params, ready_tx, loop_shutdown).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Connection loop exited with error");
            } else {
                tracing::debug!("Connection loop exited");
            }
            result
        });

        let api = match tokio::time::timeout(config.connect_timeout, ready_rx).await {
            Ok(Ok(api)) => api,
            Ok(Err(_)) => {
                // The loop dropped the ready signal; collect its error within the same bound
                shutdown.cancel();
                let abort = handle.abort_handle();
                let error = match tokio::time::timeout(config.connect_timeout, handle).await {
                    Ok(Ok(Err(e))) => e,
                    Ok(Ok(Ok(()))) => InvocationError::Dropped,
                    Ok(Err(e)) => InvocationError::Unexpected(e.to_string()),
                    Err(_) => {
                        tracing::warn!("Connection loop ignored shutdown after dropping ready");
                        abort.abort();
                        InvocationError::Dropped
                    }
                };
                return Err(InitError::Transport(error));
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = config.connect_timeout.as_secs(),
                    "Connection did not become ready in time"
                );
                shutdown.cancel();
                handle.abort();
                return Err(InitError::ConnectTimeout(config.connect_timeout));
            }
        };

        let state = match crate::rpc::with_timeout(config.rpc_timeout, api.is_authorized()).await {
            Ok(true) => {
                tracing::info!("Restored session is already authorized");
                LoginState::Authenticated
            }
            Ok(false) => LoginState::Ready,
            Err(e) => {
                tracing::warn!(error = %e, "Could not check authorization status");
                LoginState::Ready
            }
        };

        Ok(Self {
            inner: Arc::new(SessionInner {
                api_id,
                api_hash: api_hash.to_string(),
                config,
                api,
                login: RwLock::new(state),
                shutdown,
            }),
        })
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.read_login().public()
    }

    /// Non-blocking check of the authentication flag
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.read_login(), LoginState::Authenticated)
    }

    /// Call capability of an authenticated session
    pub fn authenticated_api(&self) -> Result<Arc<dyn RemoteApi>, ResolveError> {
        if self.is_authenticated() {
            Ok(Arc::clone(&self.inner.api))
        } else {
            Err(ResolveError::NotAuthenticated)
        }
    }

    /// Session-scoped cancellation signal; fires on logout or when the last
    /// clone is dropped
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Invalidate the remote session, erase persisted session material and
    /// reset to [`SessionState::Uninitialized`].
    ///
    /// The connection loop is shut down even when the remote call fails; the
    /// error is still reported.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if matches!(*self.read_login(), LoginState::LoggedOut) {
            return Err(AuthError::NotConnected);
        }

        tracing::info!("Logging out");
        let remote = crate::rpc::with_timeout(
            self.inner.config.logout_timeout,
            self.inner.api.log_out(),
        )
        .await;
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "Remote logout failed");
        }

        self.set_login(LoginState::LoggedOut);
        self.inner.shutdown.cancel();

        let session_path = self.inner.config.session_path();
        match tokio::fs::remove_file(&session_path).await {
            Ok(()) => {
                tracing::debug!(path = %session_path.display(), "Removed session file");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %session_path.display(),
                    error = %e,
                    "Failed to remove session file"
                );
            }
        }

        remote.map_err(AuthError::from)
    }

    pub(crate) fn api(&self) -> Result<&Arc<dyn RemoteApi>, AuthError> {
        if matches!(*self.read_login(), LoginState::LoggedOut) {
            Err(AuthError::NotConnected)
        } else {
            Ok(&self.inner.api)
        }
    }

    pub(crate) fn credentials(&self) -> (i32, &str) {
        (self.inner.api_id, &self.inner.api_hash)
    }

    pub(crate) fn rpc_timeout(&self) -> std::time::Duration {
        self.inner.config.rpc_timeout
    }

    pub(crate) fn read_login(&self) -> std::sync::RwLockReadGuard<'_, LoginState> {
        self.inner
            .login
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_login(&self, state: LoginState) {
        let mut guard = self
            .inner
            .login
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = %guard.public(), to = %state.public(), "Login state transition");
        *guard = state;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api_id", &self.inner.api_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
