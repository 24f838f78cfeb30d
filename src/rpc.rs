//! Remote RPC capability consumed by the session and the resolver.
//!
//! The messaging protocol itself (transport, encryption, framing) lives behind
//! two traits:
//! - [`Connector`] runs the long-lived connection loop and hands out a
//!   [`RemoteApi`] call capability once the connection is ready
//! - [`RemoteApi`] issues request/response calls on that live connection
//!
//! The types in this module are the plain-data view of the remote objects the
//! core needs: sent-code answers, authorizations, 2FA parameters, channels,
//! messages and their attachments.

use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::InvocationError;

/// Run a remote call under a bounded timeout.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, InvocationError>>,
) -> Result<T, InvocationError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| InvocationError::Timeout(limit))?
}

/// Application identity plus the location of persisted session material
#[derive(Clone, Debug)]
pub struct ConnectParams {
    /// Numeric application id
    pub api_id: i32,
    /// Application secret
    pub api_hash: String,
    /// Persisted session file (may not exist yet)
    pub session_path: PathBuf,
}

/// Opens the connection and drives its protocol loop.
///
/// `run` is spawned on a dedicated task for the lifetime of the session. It
/// must send the call capability through `ready` once the connection can
/// serve requests, then keep the loop alive until `shutdown` fires. Returning
/// an error before sending on `ready` fails initialization with that error.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Run the connection loop until `shutdown` is cancelled
    async fn run(
        &self,
        params: ConnectParams,
        ready: oneshot::Sender<Arc<dyn RemoteApi>>,
        shutdown: CancellationToken,
    ) -> Result<(), InvocationError>;
}

/// Request/response calls on a live connection.
///
/// Errors are surfaced verbatim as the failing operation's message.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Whether the restored session material is already authorized
    async fn is_authorized(&self) -> Result<bool, InvocationError>;

    /// `auth.sendCode`
    async fn send_code(
        &self,
        phone: &str,
        api_id: i32,
        api_hash: &str,
    ) -> Result<SentCode, InvocationError>;

    /// `auth.signIn`
    async fn sign_in(
        &self,
        phone: &str,
        phone_code_hash: &str,
        code: &str,
    ) -> Result<Authorization, InvocationError>;

    /// `account.getPassword`
    async fn get_password(&self) -> Result<PasswordParams, InvocationError>;

    /// `auth.checkPassword`
    async fn check_password(
        &self,
        proof: PasswordProof,
    ) -> Result<Authorization, InvocationError>;

    /// `auth.logOut`
    async fn log_out(&self) -> Result<(), InvocationError>;

    /// `contacts.resolveUsername`, returning the chats of the result
    async fn resolve_username(&self, username: &str) -> Result<Vec<Chat>, InvocationError>;

    /// `messages.getDialogs` (first page), returning the chats of the result
    async fn get_dialogs(&self, limit: i32) -> Result<Vec<Chat>, InvocationError>;

    /// `channels.getMessages` for a single message id
    async fn get_messages(
        &self,
        channel: &ChannelPeer,
        message_id: i32,
    ) -> Result<Vec<Message>, InvocationError>;
}

/// Answer to a code request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentCode {
    /// A code was sent; the hash must accompany the sign-in
    CodeSent {
        /// Phone-code verification token
        phone_code_hash: String,
    },
    /// The server authorized the session without a code challenge
    Success,
}

/// Answer to a sign-in or password check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    /// The session is now authorized
    Authorized,
    /// The phone number has no account yet
    SignUpRequired,
}

/// Account 2FA configuration (`account.password`)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasswordParams {
    /// Current key-derivation algorithm; `None` when 2FA is disabled
    pub current_algo: Option<PasswordKdfAlgo>,
    /// Server SRP public value `g_b`
    pub srp_b: Option<Vec<u8>>,
    /// SRP session id
    pub srp_id: Option<i64>,
    /// Password hint set by the account owner
    pub hint: Option<String>,
}

/// Password key-derivation algorithm
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PasswordKdfAlgo {
    /// `passwordKdfAlgoSHA256SHA256PBKDF2HMACSHA512iter100000SHA256ModPow`
    Sha256Sha256Pbkdf2Sha512ModPow {
        /// Client salt
        salt1: Vec<u8>,
        /// Server salt
        salt2: Vec<u8>,
        /// Generator
        g: i32,
        /// 2048-bit safe prime, big-endian
        p: Vec<u8>,
    },
    /// Any algorithm this client does not implement
    Unknown,
}

/// Salted proof sent instead of the plaintext password (`inputCheckPasswordSRP`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordProof {
    /// SRP session id echoed back
    pub srp_id: i64,
    /// Client public value `g_a` (256 bytes)
    pub a: Vec<u8>,
    /// Proof `M1` (32 bytes)
    pub m1: Vec<u8>,
}

/// Concrete channel handle usable in further calls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelPeer {
    /// Channel id
    pub id: i64,
    /// Access hash bound to this session
    pub access_hash: i64,
}

/// A chat as listed in dialogs or lookup results
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chat {
    /// A channel or supergroup
    Channel {
        /// Channel handle
        peer: ChannelPeer,
        /// Display title
        title: String,
    },
    /// Basic groups, users and anything else the resolver ignores
    Other,
}

/// A fetched message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// A regular message, possibly carrying an attachment
    Message {
        /// Message id
        id: i32,
        /// Attachment, if any
        media: Option<MessageMedia>,
    },
    /// Empty or service message
    Other,
}

/// Attachment kinds
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageMedia {
    /// Document (video, audio, file); `None` when the document is empty
    Document(Option<Document>),
    /// Photo; `None` when the photo is empty
    Photo(Option<Photo>),
    /// Any other attachment (geo, poll, web page, ...), named by kind
    Other(String),
}

/// Document object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Document id
    pub id: i64,
    /// Access hash
    pub access_hash: i64,
    /// File reference bytes
    pub file_reference: Vec<u8>,
    /// Size in bytes
    pub size: i64,
    /// Declared attributes
    pub attributes: Vec<DocumentAttribute>,
}

/// Declared document attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentAttribute {
    /// Original file name
    Filename(String),
    /// Video, audio, sticker and other attributes
    Other,
}

/// Photo object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Photo {
    /// Photo id
    pub id: i64,
    /// Access hash
    pub access_hash: i64,
    /// File reference bytes
    pub file_reference: Vec<u8>,
    /// Declared size variants
    pub sizes: Vec<PhotoSize>,
}

/// Declared photo size variant
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoSize {
    /// Stored variant with a known byte size
    Sized {
        /// Thumbnail type letter (`"s"`, `"m"`, `"x"`, `"y"`, ...)
        kind: String,
        /// Size in bytes
        size: i64,
    },
    /// Stripped, cached or progressive variants
    Other,
}

/// Engine-specific location handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileLocation {
    /// `inputDocumentFileLocation`
    Document {
        /// Document id
        id: i64,
        /// Access hash
        access_hash: i64,
        /// File reference bytes
        file_reference: Vec<u8>,
    },
    /// `inputPhotoFileLocation`
    Photo {
        /// Photo id
        id: i64,
        /// Access hash
        access_hash: i64,
        /// File reference bytes
        file_reference: Vec<u8>,
        /// Selected size variant
        thumb_size: String,
    },
}

/// Handle plus metadata needed to stream one attachment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFileReference {
    /// Location handle passed to the download engine
    pub location: FileLocation,
    /// Resolved filename
    pub filename: String,
    /// Total size in bytes
    pub size: u64,
}
