//! Remote object resolution: link descriptor → channel → message → file.
//!
//! Every remote step runs under the configured `resolve_timeout`.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DownloadConfig;
use crate::error::ResolveError;
use crate::link::{ChannelRef, LinkDescriptor};
use crate::rpc::{
    ChannelPeer, Chat, DocumentAttribute, FileLocation, Message, MessageMedia, PhotoSize,
    RemoteApi, RemoteFileReference, with_timeout,
};
use crate::session::Session;

/// Filename used for documents that declare none
pub const DEFAULT_DOCUMENT_FILENAME: &str = "download.bin";

/// Resolves link descriptors into streamable file references
#[derive(Clone)]
pub struct Resolver {
    api: Arc<dyn RemoteApi>,
    timeout: Duration,
    dialog_page_size: i32,
}

impl Resolver {
    /// Build a resolver over an explicit call capability
    pub fn new(api: Arc<dyn RemoteApi>, config: &DownloadConfig) -> Self {
        Self {
            api,
            timeout: config.resolve_timeout,
            dialog_page_size: config.dialog_page_size,
        }
    }

    /// Build a resolver over an authenticated session's capability
    pub fn for_session(session: &Session, config: &DownloadConfig) -> Result<Self, ResolveError> {
        Ok(Self::new(session.authenticated_api()?, config))
    }

    /// Call capability used by this resolver
    pub fn api(&self) -> &Arc<dyn RemoteApi> {
        &self.api
    }

    /// Resolve a descriptor all the way to its attachment
    pub async fn resolve(
        &self,
        descriptor: &LinkDescriptor,
    ) -> Result<RemoteFileReference, ResolveError> {
        let peer = self.resolve_channel(descriptor).await?;
        self.resolve_file(&peer, descriptor.message_id).await
    }

    /// Resolve the descriptor's channel identity to a concrete handle.
    ///
    /// Public channels are looked up by username. Private channels are found
    /// among the first page of the session's dialogs, so the account must be a
    /// member.
    pub async fn resolve_channel(
        &self,
        descriptor: &LinkDescriptor,
    ) -> Result<ChannelPeer, ResolveError> {
        match &descriptor.channel {
            ChannelRef::Username(username) => {
                tracing::debug!(username = %username, "Resolving public channel");
                let chats = with_timeout(self.timeout, self.api.resolve_username(username))
                    .await?;
                first_channel(&chats, |_| true).ok_or_else(|| {
                    ResolveError::ChannelNotFound(format!(
                        "could not find channel for @{username}"
                    ))
                })
            }
            ChannelRef::Id(channel_id) => {
                tracing::debug!(
                    channel_id,
                    page_size = self.dialog_page_size,
                    "Resolving private channel from dialogs"
                );
                let chats = with_timeout(self.timeout, self.api.get_dialogs(self.dialog_page_size))
                    .await?;
                first_channel(&chats, |peer| peer.id == *channel_id).ok_or_else(|| {
                    ResolveError::ChannelNotFound(format!(
                        "channel {channel_id} not found in your dialogs, make sure you're a member of this channel"
                    ))
                })
            }
        }
    }

    /// Fetch a message and extract its attachment
    pub async fn resolve_file(
        &self,
        peer: &ChannelPeer,
        message_id: i32,
    ) -> Result<RemoteFileReference, ResolveError> {
        let messages =
            with_timeout(self.timeout, self.api.get_messages(peer, message_id)).await?;

        let message = messages.first().ok_or(ResolveError::MessageNotFound {
            message_id,
            reason: "no messages found",
        })?;
        let media = match message {
            Message::Message {
                media: Some(media), ..
            } => media,
            Message::Message { media: None, .. } => {
                return Err(ResolveError::MessageNotFound {
                    message_id,
                    reason: "message has no media",
                });
            }
            Message::Other => {
                return Err(ResolveError::MessageNotFound {
                    message_id,
                    reason: "unsupported message type",
                });
            }
        };

        let file = extract_file_reference(media)?;
        tracing::debug!(
            channel_id = peer.id,
            message_id,
            filename = %file.filename,
            size = file.size,
            "Resolved attachment"
        );
        Ok(file)
    }
}

fn first_channel(chats: &[Chat], matches: impl Fn(&ChannelPeer) -> bool) -> Option<ChannelPeer> {
    chats.iter().find_map(|chat| match chat {
        Chat::Channel { peer, .. } if matches(peer) => Some(*peer),
        _ => None,
    })
}

/// Turn an attachment into a file reference.
///
/// Documents keep their declared filename (or [`DEFAULT_DOCUMENT_FILENAME`]).
/// Photos are named `photo_<id>.jpg` and use their largest stored variant.
pub fn extract_file_reference(media: &MessageMedia) -> Result<RemoteFileReference, ResolveError> {
    match media {
        MessageMedia::Document(Some(doc)) => {
            let filename = doc
                .attributes
                .iter()
                .find_map(|attr| match attr {
                    DocumentAttribute::Filename(name) if !name.is_empty() => Some(name.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| DEFAULT_DOCUMENT_FILENAME.to_string());
            Ok(RemoteFileReference {
                location: FileLocation::Document {
                    id: doc.id,
                    access_hash: doc.access_hash,
                    file_reference: doc.file_reference.clone(),
                },
                filename,
                size: doc.size.max(0) as u64,
            })
        }
        MessageMedia::Document(None) => Err(ResolveError::InvalidMedia("invalid document".into())),
        MessageMedia::Photo(Some(photo)) => {
            let (kind, size) = photo
                .sizes
                .iter()
                .filter_map(|size| match size {
                    PhotoSize::Sized { kind, size } => Some((kind, *size)),
                    PhotoSize::Other => None,
                })
                .max_by_key(|(_, size)| *size)
                .ok_or_else(|| ResolveError::InvalidMedia("no photo sizes found".into()))?;
            Ok(RemoteFileReference {
                location: FileLocation::Photo {
                    id: photo.id,
                    access_hash: photo.access_hash,
                    file_reference: photo.file_reference.clone(),
                    thumb_size: kind.clone(),
                },
                filename: format!("photo_{}.jpg", photo.id),
                size: size.max(0) as u64,
            })
        }
        MessageMedia::Photo(None) => Err(ResolveError::InvalidMedia("invalid photo".into())),
        MessageMedia::Other(kind) => Err(ResolveError::UnsupportedMediaType(kind.clone())),
    }
}
