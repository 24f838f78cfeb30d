//! Scripted stand-ins for the remote service, its connection and the
//! transfer engine, built only on the crate's public traits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teleturbo::error::{EngineError, InvocationError, RpcError};
use teleturbo::rpc::{
    Authorization, ChannelPeer, Chat, ConnectParams, Document, DocumentAttribute, Message,
    MessageMedia, PasswordKdfAlgo, PasswordParams, PasswordProof, Photo, PhotoSize, SentCode,
};
use teleturbo::{Connector, DownloadEngine, RemoteApi, RemoteFileReference};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Code that signs in directly
pub const GOOD_CODE: &str = "11111";
/// Code that signs in but needs the 2FA password next
pub const CODE_NEEDING_PASSWORD: &str = "22222";
/// Accepted 2FA password
pub const GOOD_PASSWORD: &str = "correct horse";

/// Public channel username served by [`ScriptedApi::with_fixtures`]
pub const PUBLIC_CHANNEL: &str = "teleturbo_demo";
/// Public channel handle
pub const PUBLIC_PEER: ChannelPeer = ChannelPeer {
    id: 1001,
    access_hash: 9,
};
/// Private channel the account is a member of
pub const PRIVATE_PEER: ChannelPeer = ChannelPeer {
    id: 2002,
    access_hash: 8,
};

/// `report.pdf`, 300 000 bytes
pub const REPORT_LINK: &str = "https://t.me/teleturbo_demo/10";
pub const REPORT_SIZE: u64 = 300_000;
/// Photo 555 with a 4 000 byte largest variant
pub const PHOTO_LINK: &str = "t.me/teleturbo_demo/11";
/// Text-only message
pub const TEXT_LINK: &str = "t.me/teleturbo_demo/12";
/// Location attachment
pub const GEO_LINK: &str = "t.me/teleturbo_demo/13";
/// Nameless document in the private channel
pub const PRIVATE_LINK: &str = "https://t.me/c/2002/7";
pub const PRIVATE_SIZE: u64 = 1024;

const PRIME_HEX: &str = "EEAF0AB9ADB38DD69C33F80AFA8FC5E86072618775FF3C0B9EA2314C9C256576D674DF7496EA81D3383B4813D692C6E0E0D5D8E250B98BE48E495C1D6089DAD15DC7D7B46154D6B6CE8EF4AD69B15D4982559B297BCF1885C529F566660E57EC68EDBC3C05726CC02FD4CBF4976EAA9AFD5138FE8376435B9FC61D2FC0EB06E3";

fn prime() -> Vec<u8> {
    hex::decode(PRIME_HEX).expect("hex")
}

fn rpc_error(message: &str) -> InvocationError {
    RpcError::from_telegram(400, message).into()
}

/// Remote service answering from in-memory fixtures
#[derive(Default)]
pub struct ScriptedApi {
    authorized: AtomicBool,
    two_factor: AtomicBool,
    calls: AtomicUsize,
    proofs: Mutex<Vec<PasswordProof>>,
    usernames: Mutex<HashMap<String, ChannelPeer>>,
    dialogs: Mutex<Vec<Chat>>,
    messages: Mutex<HashMap<(i64, i32), Option<MessageMedia>>>,
}

impl ScriptedApi {
    /// Public and private channels with a document, a photo, a text message
    /// and an unsupported attachment
    pub fn with_fixtures() -> Arc<Self> {
        let api = Self::default();
        api.two_factor.store(true, Ordering::SeqCst);
        api.usernames
            .lock()
            .unwrap()
            .insert(PUBLIC_CHANNEL.to_string(), PUBLIC_PEER);
        api.dialogs.lock().unwrap().extend([
            Chat::Other,
            Chat::Channel {
                peer: PRIVATE_PEER,
                title: "Members only".into(),
            },
        ]);

        let mut messages = api.messages.lock().unwrap();
        messages.insert(
            (PUBLIC_PEER.id, 10),
            Some(document(Some("report.pdf"), REPORT_SIZE as i64)),
        );
        messages.insert(
            (PUBLIC_PEER.id, 11),
            Some(MessageMedia::Photo(Some(Photo {
                id: 555,
                access_hash: 3,
                file_reference: vec![1],
                sizes: vec![
                    PhotoSize::Other,
                    PhotoSize::Sized {
                        kind: "x".into(),
                        size: 4_000,
                    },
                    PhotoSize::Sized {
                        kind: "m".into(),
                        size: 900,
                    },
                ],
            }))),
        );
        messages.insert((PUBLIC_PEER.id, 12), None);
        messages.insert((PUBLIC_PEER.id, 13), Some(MessageMedia::Other("geo".into())));
        messages.insert(
            (PRIVATE_PEER.id, 7),
            Some(document(None, PRIVATE_SIZE as i64)),
        );
        drop(messages);
        Arc::new(api)
    }

    /// Treat restored session material as authorized
    pub fn authorize(&self) {
        self.authorized.store(true, Ordering::SeqCst);
    }

    /// Account without a 2FA password
    pub fn disable_two_factor(&self) {
        self.two_factor.store(false, Ordering::SeqCst);
    }

    /// Every remote call except the authorization check
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Proofs received by `check_password`
    pub fn proofs(&self) -> Vec<PasswordProof> {
        self.proofs.lock().unwrap().clone()
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn document(filename: Option<&str>, size: i64) -> MessageMedia {
    let mut attributes = vec![DocumentAttribute::Other];
    if let Some(name) = filename {
        attributes.push(DocumentAttribute::Filename(name.to_string()));
    }
    MessageMedia::Document(Some(Document {
        id: size,
        access_hash: 5,
        file_reference: vec![2],
        size,
        attributes,
    }))
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn is_authorized(&self) -> Result<bool, InvocationError> {
        Ok(self.authorized.load(Ordering::SeqCst))
    }

    async fn send_code(
        &self,
        _phone: &str,
        _api_id: i32,
        _api_hash: &str,
    ) -> Result<SentCode, InvocationError> {
        self.count();
        Ok(SentCode::CodeSent {
            phone_code_hash: "scripted-hash".into(),
        })
    }

    async fn sign_in(
        &self,
        _phone: &str,
        phone_code_hash: &str,
        code: &str,
    ) -> Result<Authorization, InvocationError> {
        self.count();
        assert_eq!(phone_code_hash, "scripted-hash");
        match code {
            GOOD_CODE => {
                self.authorize();
                Ok(Authorization::Authorized)
            }
            CODE_NEEDING_PASSWORD => Err(rpc_error("SESSION_PASSWORD_NEEDED")),
            _ => Err(rpc_error("PHONE_CODE_INVALID")),
        }
    }

    async fn get_password(&self) -> Result<PasswordParams, InvocationError> {
        self.count();
        if !self.two_factor.load(Ordering::SeqCst) {
            return Ok(PasswordParams::default());
        }
        Ok(PasswordParams {
            current_algo: Some(PasswordKdfAlgo::Sha256Sha256Pbkdf2Sha512ModPow {
                salt1: b"salt-one".to_vec(),
                salt2: b"salt-two".to_vec(),
                g: 2,
                p: prime(),
            }),
            srp_b: Some(vec![0x17; 128]),
            srp_id: Some(4242),
            hint: None,
        })
    }

    async fn check_password(&self, proof: PasswordProof) -> Result<Authorization, InvocationError> {
        self.count();
        self.proofs.lock().unwrap().push(proof);
        self.authorize();
        Ok(Authorization::Authorized)
    }

    async fn log_out(&self) -> Result<(), InvocationError> {
        self.count();
        self.authorized.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_username(&self, username: &str) -> Result<Vec<Chat>, InvocationError> {
        self.count();
        let usernames = self.usernames.lock().unwrap();
        Ok(usernames
            .get(username)
            .map(|peer| Chat::Channel {
                peer: *peer,
                title: username.to_string(),
            })
            .into_iter()
            .collect())
    }

    async fn get_dialogs(&self, _limit: i32) -> Result<Vec<Chat>, InvocationError> {
        self.count();
        Ok(self.dialogs.lock().unwrap().clone())
    }

    async fn get_messages(
        &self,
        channel: &ChannelPeer,
        message_id: i32,
    ) -> Result<Vec<Message>, InvocationError> {
        self.count();
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .get(&(channel.id, message_id))
            .map(|media| Message::Message {
                id: message_id,
                media: media.clone(),
            })
            .into_iter()
            .collect())
    }
}

/// Connection that becomes ready at once and idles until shutdown
pub struct ScriptedConnector {
    api: Option<Arc<ScriptedApi>>,
}

impl ScriptedConnector {
    pub fn new(api: Arc<ScriptedApi>) -> Arc<Self> {
        Arc::new(Self { api: Some(api) })
    }

    /// A connection that never reports ready
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self { api: None })
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn run(
        &self,
        params: ConnectParams,
        ready: oneshot::Sender<Arc<dyn RemoteApi>>,
        shutdown: CancellationToken,
    ) -> Result<(), InvocationError> {
        assert_eq!(params.api_id, 12345);
        if let Some(api) = &self.api {
            tokio::fs::write(&params.session_path, b"{}").await?;
            ready.send(api.clone()).ok();
        }
        shutdown.cancelled().await;
        Ok(())
    }
}

/// Engine writing filler bytes in chunks, observing cancellation between them
#[derive(Default)]
pub struct MemoryEngine {
    pub calls: AtomicUsize,
    chunk_delay: Option<Duration>,
}

impl MemoryEngine {
    pub fn instant() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pause between 16 KiB chunks
    pub fn paced(chunk_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            chunk_delay: Some(chunk_delay),
        })
    }
}

#[async_trait]
impl DownloadEngine for MemoryEngine {
    async fn stream(
        &self,
        _api: Arc<dyn RemoteApi>,
        file: &RemoteFileReference,
        threads: usize,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        cancel: CancellationToken,
    ) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(threads >= 1);

        let chunk = vec![0xAB; 16 * 1024];
        let mut remaining = file.size as usize;
        while remaining > 0 {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let n = remaining.min(chunk.len());
            sink.write_all(&chunk[..n]).await?;
            remaining -= n;
            if let Some(delay) = self.chunk_delay {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        Ok(())
    }
}
