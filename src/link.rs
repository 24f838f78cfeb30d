//! Telegram message link parsing.
//!
//! Accepted shapes, after stripping surrounding whitespace, any `http://` or
//! `https://` scheme and a leading `www.`:
//!
//! - `t.me/c/<channelId>/<messageId>` - private channel, addressed by numeric id
//! - `t.me/<username>/<messageId>` - public channel, addressed by username
//!
//! Matching is lexical. The first path segment literally equal to `c` that is
//! followed by two more segments selects the private form, wherever it occurs.

use crate::error::LinkError;

/// The channel a link points into
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelRef {
    /// Private channel numeric id (from `t.me/c/<id>/...`)
    Id(i64),
    /// Public channel username (from `t.me/<username>/...`)
    Username(String),
}

/// Normalized reference to a remote message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkDescriptor {
    /// Target channel identity
    pub channel: ChannelRef,
    /// Message id within the channel
    pub message_id: i32,
}

impl LinkDescriptor {
    /// Private links address channels by id and require membership
    pub fn is_private(&self) -> bool {
        matches!(self.channel, ChannelRef::Id(_))
    }

    /// Channel numeric id, for private links
    pub fn channel_id(&self) -> Option<i64> {
        match self.channel {
            ChannelRef::Id(id) => Some(id),
            ChannelRef::Username(_) => None,
        }
    }

    /// Channel username, for public links
    pub fn username(&self) -> Option<&str> {
        match &self.channel {
            ChannelRef::Id(_) => None,
            ChannelRef::Username(name) => Some(name),
        }
    }
}

impl std::str::FromStr for LinkDescriptor {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_link(s)
    }
}

/// Parse a user-supplied message link into a [`LinkDescriptor`].
///
/// Pure function: no I/O, safe to call before authentication.
///
/// # Examples
///
/// ```
/// use teleturbo::link::{parse_link, ChannelRef};
///
/// let private = parse_link("https://t.me/c/1234567890/123").unwrap();
/// assert_eq!(private.channel, ChannelRef::Id(1234567890));
/// assert_eq!(private.message_id, 123);
/// assert!(private.is_private());
///
/// let public = parse_link("t.me/examplechannel/55").unwrap();
/// assert_eq!(public.username(), Some("examplechannel"));
/// assert!(!public.is_private());
///
/// assert!(parse_link("not-a-link").is_err());
/// ```
pub fn parse_link(link: &str) -> Result<LinkDescriptor, LinkError> {
    let link = normalize(link);
    let parts: Vec<&str> = link.split('/').collect();

    if link.contains("/c/")
        && let Some(i) = parts
            .iter()
            .enumerate()
            .position(|(i, part)| *part == "c" && i + 2 < parts.len())
    {
        let channel_id = parts[i + 1]
            .parse::<i64>()
            .map_err(|e| LinkError::InvalidChannelId(format!("{}: {e}", parts[i + 1])))?;
        let message_id = parse_message_id(parts[i + 2])?;
        return Ok(LinkDescriptor {
            channel: ChannelRef::Id(channel_id),
            message_id,
        });
    }

    if link.starts_with("t.me/") && parts.len() >= 3 {
        let message_id = parse_message_id(parts[2])?;
        return Ok(LinkDescriptor {
            channel: ChannelRef::Username(parts[1].to_string()),
            message_id,
        });
    }

    Err(LinkError::UnsupportedFormat)
}

fn normalize(link: &str) -> String {
    let link = link
        .trim()
        .replace("https://", "")
        .replace("http://", "");
    match link.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => link,
    }
}

fn parse_message_id(segment: &str) -> Result<i32, LinkError> {
    segment
        .parse::<i32>()
        .map_err(|e| LinkError::InvalidMessageId(format!("{segment}: {e}")))
}
