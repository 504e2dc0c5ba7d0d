//! Codec for persisted conversation history.
//!
//! On disk a conversation is one JSON value: a versioned envelope
//! `{"v":1,"messages":[…]}` of wire records
//! `{text?, fileUrl?, fileType?, sender, timestamp}`. Reads also accept
//! the legacy bare-array form written by earlier clients and migrate it
//! on read. Decoding is defensive throughout: a malformed payload yields
//! `None`, an individually invalid record is skipped and counted, and
//! neither ever aborts a load.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::attachments::DataUrl;
use crate::chat::core::errors::ChatResult;
use crate::chat::core::message::{Attachment, AttachmentKind, Message, MessageBody, Sender};

/// Version of the persisted history envelope.
pub const HISTORY_SCHEMA_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileUrl", default, skip_serializing_if = "Option::is_none")]
    file_url: Option<String>,
    #[serde(rename = "fileType", default, skip_serializing_if = "Option::is_none")]
    file_type: Option<String>,
    sender: String,
    timestamp: i64,
}

#[derive(Serialize)]
struct Envelope {
    v: u16,
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct RawEnvelope {
    v: u16,
    messages: Vec<Value>,
}

/// Outcome of decoding a stored payload.
#[derive(Debug)]
pub struct DecodedHistory {
    /// Messages restored in append order.
    pub messages: Vec<Message>,
    /// Records dropped because they violate the message invariant.
    pub skipped: usize,
    /// Whether the payload was in the legacy bare-array form.
    pub migrated: bool,
}

/// Encode a history as the versioned envelope.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn encode_history(messages: &[Message]) -> ChatResult<String> {
    let envelope = Envelope {
        v: HISTORY_SCHEMA_VERSION,
        messages: messages.iter().map(to_wire).collect(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode a stored payload, `None` when it is malformed beyond recovery.
#[must_use]
pub fn decode_history(raw: &str) -> Option<DecodedHistory> {
    let value: Value = serde_json::from_str(raw).ok()?;

    let (records, migrated) = match value {
        Value::Array(records) => (records, true),
        Value::Object(_) => {
            let envelope: RawEnvelope = serde_json::from_value(value).ok()?;
            if envelope.v != HISTORY_SCHEMA_VERSION {
                return None;
            }
            (envelope.messages, false)
        }
        _ => return None,
    };

    let mut messages = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for record in records {
        match serde_json::from_value::<WireMessage>(record)
            .ok()
            .and_then(to_message)
        {
            Some(message) => messages.push(message),
            None => skipped += 1,
        }
    }

    Some(DecodedHistory {
        messages,
        skipped,
        migrated,
    })
}

fn to_wire(message: &Message) -> WireMessage {
    let (text, file_url, file_type) = match &message.body {
        MessageBody::Text(body) => (Some(body.clone()), None, None),
        MessageBody::Attachment(attachment) => (
            attachment.caption.clone(),
            Some(attachment.data.as_str().to_string()),
            Some(attachment.kind.wire_name().to_string()),
        ),
    };
    WireMessage {
        text,
        file_url,
        file_type,
        sender: message.sender.as_str().to_string(),
        timestamp: message.timestamp_ms,
    }
}

fn to_message(wire: WireMessage) -> Option<Message> {
    let sender: Sender = wire.sender.parse().ok()?;

    let body = if let (Some(url), Some(kind)) = (wire.file_url, wire.file_type) {
        MessageBody::Attachment(Attachment {
            data: DataUrl::from_raw(url),
            kind: AttachmentKind::from_wire(&kind),
            caption: wire.text,
        })
    } else if let Some(text) = wire.text {
        // A half-present attachment degrades to its text, never to nothing.
        MessageBody::Text(text)
    } else {
        return None;
    };

    Some(Message {
        sender,
        timestamp_ms: wire.timestamp,
        body,
    })
}
