//! Error types for teleturbo
//!
//! This module provides the error taxonomy for the library:
//! - Link parsing errors (rejected before any task or network call)
//! - Session initialization and authentication errors (returned synchronously)
//! - Remote object resolution and download engine errors (captured into the
//!   task's terminal `error` status)
//! - Machine-readable error codes for shells

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::types::TaskId;

/// Result type alias for teleturbo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for teleturbo
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_threads")
        key: Option<String>,
    },

    /// The supplied link could not be parsed
    #[error("invalid link: {0}")]
    Link(#[from] LinkError),

    /// Session could not be initialized
    #[error("session initialization failed: {0}")]
    Init(#[from] InitError),

    /// A login step failed
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A remote object could not be resolved
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// The download engine failed
    #[error("download engine error: {0}")]
    Engine(#[from] EngineError),

    /// No task registered under this identity
    #[error("download not found: {0}")]
    NotFound(TaskId),

    /// The task manager was shut down and accepts no new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable error code, suitable for shells and UIs
    pub fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Link(e) => e.error_code(),
            Error::Init(e) => e.error_code(),
            Error::Auth(e) => e.error_code(),
            Error::Resolve(e) => e.error_code(),
            Error::Engine(e) => e.error_code(),
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

/// Link parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The channel segment of a private link is not a 64-bit integer
    #[error("invalid channel ID: {0}")]
    InvalidChannelId(String),

    /// The message segment is not an integer
    #[error("invalid message ID: {0}")]
    InvalidMessageId(String),

    /// Neither the private nor the public link shape matched
    #[error(
        "unsupported link format. Use https://t.me/c/CHANNEL_ID/MSG_ID or https://t.me/USERNAME/MSG_ID"
    )]
    UnsupportedFormat,
}

impl LinkError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            LinkError::InvalidChannelId(_) => "invalid_channel_id",
            LinkError::InvalidMessageId(_) => "invalid_message_id",
            LinkError::UnsupportedFormat => "unsupported_format",
        }
    }
}

/// Session initialization errors
#[derive(Debug, Error)]
pub enum InitError {
    /// The connection did not report ready within the bounded timeout
    #[error("client timed out connecting to Telegram after {}s", .0.as_secs())]
    ConnectTimeout(Duration),

    /// The connection loop failed before becoming ready
    #[error("client failed to start: {0}")]
    Transport(InvocationError),

    /// The session directory could not be prepared
    #[error("failed to create session directory: {0}")]
    Io(#[from] io::Error),
}

impl InitError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            InitError::ConnectTimeout(_) => "connect_timeout",
            InitError::Transport(_) => "transport_error",
            InitError::Io(_) => "io_error",
        }
    }
}

/// Authentication (login state machine) errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Phone number does not start with `+` after normalization
    #[error("Phone number must start with + and country code (e.g., +1234567890)")]
    InvalidPhoneFormat,

    /// A login step was called outside the state it belongs to
    #[error("No active login flow")]
    NoActiveLoginFlow,

    /// The code entered was wrong or has expired
    #[error("invalid or expired code")]
    InvalidCode,

    /// A password was submitted but the account has no 2FA configured
    #[error("No password needed - 2FA not enabled on this account")]
    PasswordNotConfigured,

    /// The account's password algorithm is not supported
    #[error("unsupported password algorithm")]
    UnsupportedPasswordAlgorithm,

    /// The session's connection is gone (logged out or never connected)
    #[error("client not connected")]
    NotConnected,

    /// The remote call failed
    #[error("{0}")]
    Rpc(#[from] InvocationError),
}

impl AuthError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            AuthError::InvalidPhoneFormat => "invalid_phone_format",
            AuthError::NoActiveLoginFlow => "no_active_login_flow",
            AuthError::InvalidCode => "invalid_code",
            AuthError::PasswordNotConfigured => "password_not_configured",
            AuthError::UnsupportedPasswordAlgorithm => "unsupported_password_algorithm",
            AuthError::NotConnected => "not_connected",
            AuthError::Rpc(e) => e.error_code(),
        }
    }
}

/// Remote object resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The channel is unknown (username lookup failed, or not a member)
    #[error("{0}")]
    ChannelNotFound(String),

    /// The message is missing or carries no attachment
    #[error("message {message_id}: {reason}")]
    MessageNotFound {
        /// The requested message id
        message_id: i32,
        /// Why the message could not be used
        reason: &'static str,
    },

    /// The attachment is neither a document nor a photo
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The attachment is of a supported kind but unusable (empty or sizeless)
    #[error("{0}")]
    InvalidMedia(String),

    /// The session is not authenticated
    #[error("not authenticated")]
    NotAuthenticated,

    /// The remote call failed
    #[error("{0}")]
    Rpc(#[from] InvocationError),
}

impl ResolveError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            ResolveError::ChannelNotFound(_) => "channel_not_found",
            ResolveError::MessageNotFound { .. } => "message_not_found",
            ResolveError::UnsupportedMediaType(_) => "unsupported_media_type",
            ResolveError::InvalidMedia(_) => "invalid_media",
            ResolveError::NotAuthenticated => "not_authenticated",
            ResolveError::Rpc(e) => e.error_code(),
        }
    }
}

/// Download engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// The transfer was aborted because its cancellation signal fired
    #[error("download cancelled")]
    Cancelled,

    /// The transfer failed
    #[error("{0}")]
    Failed(String),

    /// Writing to the sink failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            EngineError::Cancelled => "cancelled",
            EngineError::Failed(_) => "engine_failed",
            EngineError::Io(_) => "io_error",
        }
    }
}

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// An error returned by Telegram's servers in response to an RPC call.
///
/// Numeric values are stripped from the name and placed in [`RpcError::value`],
/// e.g. `FLOOD_WAIT_30` → `RpcError { code: 420, name: "FLOOD_WAIT", value: Some(30) }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcError {
    /// HTTP-like status code
    pub code: i32,
    /// Error name in SCREAMING_SNAKE_CASE with the numeric suffix removed
    pub name: String,
    /// Numeric suffix extracted from the name, if any
    pub value: Option<u32>,
}

impl RpcError {
    /// Parse a raw server message like `"FLOOD_WAIT_30"`.
    pub fn from_telegram(code: i32, message: &str) -> Self {
        if let Some((name, suffix)) = message.rsplit_once('_')
            && !suffix.is_empty()
            && suffix.chars().all(|c| c.is_ascii_digit())
            && let Ok(value) = suffix.parse::<u32>()
        {
            return Self {
                code,
                name: name.to_string(),
                value: Some(value),
            };
        }
        Self {
            code,
            name: message.to_string(),
            value: None,
        }
    }

    /// Match on the error name, with an optional `'*'` wildcard prefix or suffix.
    ///
    /// - `err.is("SESSION_PASSWORD_NEEDED")` - exact match
    /// - `err.is("PHONE_CODE_*")` - starts-with match
    /// - `err.is("*_INVALID")` - ends-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.name.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.name.ends_with(suffix)
        } else {
            self.name == pattern
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.name)?;
        if let Some(v) = self.value {
            write!(f, " (value: {v})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

/// The error type returned by every [`RemoteApi`](crate::rpc::RemoteApi) call.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Telegram rejected the request
    #[error("{0}")]
    Rpc(RpcError),

    /// Network / I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The call did not return within its bounded timeout
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The request was dropped (e.g. the connection loop shut down)
    #[error("request dropped")]
    Dropped,

    /// The server answered with something the caller cannot use
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl InvocationError {
    /// Returns `true` if this is the named RPC error (supports `'*'` wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Rpc(e) => e.is(pattern),
            _ => false,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Self::Rpc(_) => "rpc_error",
            Self::Io(_) => "io_error",
            Self::Timeout(_) => "timeout",
            Self::Dropped => "dropped",
            Self::Unexpected(_) => "unexpected_response",
        }
    }
}

impl From<RpcError> for InvocationError {
    fn from(e: RpcError) -> Self {
        Self::Rpc(e)
    }
}
