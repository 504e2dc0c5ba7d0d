//! Message model for one seller conversation.
//!
//! A message always carries content: the body is a tagged variant of
//! either text or an attachment, so "neither" is unrepresentable. Records
//! persisted by older clients that carry both text and an attachment are
//! modeled as an attachment with a caption.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::attachments::DataUrl;

/// Which side of the conversation produced a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The signed-in user browsing the marketplace.
    User,
    /// The seller behind the listing.
    Seller,
}

impl Sender {
    /// Stable string representation (storage and logs).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Seller => "seller",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown sender tag.
#[derive(Debug, Error)]
#[error("unknown sender: {0}")]
pub struct SenderParseError(pub String);

impl FromStr for Sender {
    type Err = SenderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "seller" => Ok(Self::Seller),
            other => Err(SenderParseError(other.to_string())),
        }
    }
}

/// What kind of content an attachment holds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttachmentKind {
    /// A recorded audio clip.
    Audio,
    /// An uploaded file with its declared MIME type.
    File(String),
}

impl AttachmentKind {
    /// Stable string representation: the literal `audio` tag for
    /// recordings, the MIME type otherwise.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        match self {
            Self::Audio => "audio",
            Self::File(mime) => mime,
        }
    }

    /// Parse a stored kind tag. Every string maps to a kind; anything
    /// other than the `audio` literal is a MIME type.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        if raw == "audio" {
            Self::Audio
        } else {
            Self::File(raw.to_string())
        }
    }
}

/// An embeddable attachment carried by a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attachment {
    /// Self-contained data reference, usable directly as a render source.
    pub data: DataUrl,
    /// Content kind.
    pub kind: AttachmentKind,
    /// Text stored alongside the attachment, if any.
    pub caption: Option<String>,
}

/// Message content: text or an attachment, never neither.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MessageBody {
    /// Plain text body.
    Text(String),
    /// Embeddable attachment.
    Attachment(Attachment),
}

/// One unit of conversation history.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    /// Which side produced the message.
    pub sender: Sender,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// The content.
    pub body: MessageBody,
}

impl Message {
    /// Build a text message from the signed-in user.
    #[must_use]
    pub fn user_text(body: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            sender: Sender::User,
            timestamp_ms,
            body: MessageBody::Text(body.into()),
        }
    }

    /// Build an attachment message from the signed-in user.
    #[must_use]
    pub const fn user_attachment(attachment: Attachment, timestamp_ms: i64) -> Self {
        Self {
            sender: Sender::User,
            timestamp_ms,
            body: MessageBody::Attachment(attachment),
        }
    }

    /// The text content, if any (a text body or an attachment caption).
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(body) => Some(body),
            MessageBody::Attachment(attachment) => attachment.caption.as_deref(),
        }
    }

    /// The attachment, if any.
    #[must_use]
    pub const fn attachment(&self) -> Option<&Attachment> {
        match &self.body {
            MessageBody::Attachment(attachment) => Some(attachment),
            MessageBody::Text(_) => None,
        }
    }
}
