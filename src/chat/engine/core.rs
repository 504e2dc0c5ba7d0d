//! The conversation store: one open seller conversation, write-through.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::chat::attachments::{AttachmentSource, DataUrl};
use crate::chat::capture::{MicrophoneCapture, Recorder};
use crate::chat::core::config::ChatConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{SellerId, SessionContext};
use crate::chat::core::message::{Attachment, AttachmentKind, Message};
use crate::chat::storage::codec::{decode_history, encode_history};
use crate::chat::storage::kv::{ConversationKv, SqliteConversationKv};

/// Backend dependencies for the conversation store.
pub struct ChatBackends {
    /// Key-value store holding persisted histories.
    pub kv: Arc<dyn ConversationKv>,
    /// Microphone collaborator for voice messages.
    pub microphone: Arc<dyn MicrophoneCapture>,
}

impl ChatBackends {
    /// Build the default `SQLite` backend around the given microphone.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub async fn sqlite(
        config: &ChatConfig,
        microphone: Arc<dyn MicrophoneCapture>,
    ) -> ChatResult<Self> {
        let kv = Arc::new(SqliteConversationKv::new(&config.storage).await?);
        Ok(Self { kv, microphone })
    }
}

/// How a [`ConversationStore::load`] call ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    /// No seller id was available; the store is detached and empty.
    Detached,
    /// History restored from storage; a missing key restores as empty.
    Restored {
        /// Number of messages restored.
        messages: usize,
    },
    /// The stored payload was malformed; history was reset to empty.
    Recovered,
}

/// Ordered message history for one open seller conversation.
///
/// Single writer: one instance per open conversation view, all mutations
/// through `&mut self`. Every append is mirrored to the key-value backend
/// before the operation completes; a failed write rolls the append back
/// so memory and storage never diverge.
pub struct ConversationStore {
    config: ChatConfig,
    session: SessionContext,
    kv: Arc<dyn ConversationKv>,
    microphone: Arc<dyn MicrophoneCapture>,
    seller: Option<SellerId>,
    history: Vec<Message>,
    draft: String,
    recorder: Recorder,
}

impl ConversationStore {
    /// Create a store for one conversation view.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: ChatConfig,
        session: SessionContext,
        backends: ChatBackends,
    ) -> ChatResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            session,
            kv: backends.kv,
            microphone: backends.microphone,
            seller: None,
            history: Vec::new(),
            draft: String::new(),
            recorder: Recorder::new(),
        })
    }

    /// Create a store using the `SQLite` backend.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the database
    /// cannot be initialized.
    pub async fn from_config(
        config: ChatConfig,
        session: SessionContext,
        microphone: Arc<dyn MicrophoneCapture>,
    ) -> ChatResult<Self> {
        let backends = ChatBackends::sqlite(&config, microphone).await?;
        Self::new(config, session, backends)
    }

    /// Replace the in-memory history with the persisted one for `seller`.
    ///
    /// `None` detaches the store: history becomes empty and no I/O runs.
    /// A malformed payload is recovered as an empty history rather than
    /// surfaced as a failure; individually invalid records are skipped.
    /// Idempotent for unchanged backing data.
    ///
    /// # Errors
    /// Returns an error if the key-value backend itself fails.
    pub async fn load(&mut self, seller: Option<SellerId>) -> ChatResult<LoadOutcome> {
        self.history.clear();

        let Some(seller) = seller else {
            self.seller = None;
            debug!("conversation detached for user {}", self.session.user());
            return Ok(LoadOutcome::Detached);
        };

        let key = seller.storage_key(&self.config.history.key_prefix);
        let raw = self.kv.get(&key).await?;
        self.seller = Some(seller);

        let Some(raw) = raw else {
            info!("no stored history under {key}");
            return Ok(LoadOutcome::Restored { messages: 0 });
        };

        match decode_history(&raw) {
            Some(decoded) => {
                if decoded.skipped > 0 {
                    warn!("skipped {} invalid records under {key}", decoded.skipped);
                }
                if decoded.migrated {
                    debug!("migrated legacy history under {key}");
                }
                self.history = decoded.messages;
                info!("restored {} messages under {key}", self.history.len());
                Ok(LoadOutcome::Restored {
                    messages: self.history.len(),
                })
            }
            None => {
                warn!("malformed history under {key}, starting empty");
                Ok(LoadOutcome::Recovered)
            }
        }
    }

    /// Append a text message from the signed-in user.
    ///
    /// A body that is empty after trimming is rejected locally: `Ok(None)`,
    /// nothing appended, nothing written. On success the draft buffer is
    /// cleared and the appended message returned.
    ///
    /// # Errors
    /// Returns an error if the store is detached or persistence fails.
    pub async fn send_text(&mut self, body: &str) -> ChatResult<Option<Message>> {
        if body.trim().is_empty() {
            debug!("ignoring empty message body");
            return Ok(None);
        }

        let message = Message::user_text(body, self.next_timestamp());
        let message = self.append_and_persist(message).await?;
        self.draft.clear();
        Ok(Some(message))
    }

    /// Replace the pending-input buffer.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// The pending-input buffer.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Send the pending-input buffer as a text message.
    ///
    /// # Errors
    /// Returns an error if the store is detached or persistence fails.
    pub async fn send_draft(&mut self) -> ChatResult<Option<Message>> {
        let body = std::mem::take(&mut self.draft);
        self.send_text(&body).await
    }

    /// Read one selected file and append it as an attachment message.
    ///
    /// The bytes are embedded as a base64 data URL with the source's
    /// declared MIME type. A failed read appends nothing.
    ///
    /// # Errors
    /// Returns an error if the read fails, the store is detached, or
    /// persistence fails.
    pub async fn send_file(&mut self, source: &dyn AttachmentSource) -> ChatResult<Message> {
        let bytes = source.read().await?;
        let content_type = source.content_type().to_string();
        let attachment = Attachment {
            data: DataUrl::encode(&content_type, &bytes),
            kind: AttachmentKind::File(content_type),
            caption: None,
        };
        let message = Message::user_attachment(attachment, self.next_timestamp());
        self.append_and_persist(message).await
    }

    /// Open the microphone and begin a recording session.
    ///
    /// # Errors
    /// [`ChatError::CaptureBusy`] while a session is active,
    /// [`ChatError::CaptureDenied`] when access is refused (the store
    /// stays idle).
    pub async fn start_recording(&mut self) -> ChatResult<()> {
        let microphone = Arc::clone(&self.microphone);
        self.recorder.start(microphone.as_ref()).await
    }

    /// End the recording session and append the clip as an audio message.
    ///
    /// The concatenated capture is embedded as a base64 data URL under
    /// the literal `audio` kind.
    ///
    /// # Errors
    /// [`ChatError::CaptureIdle`] when no session is active; a capture or
    /// persistence failure appends nothing.
    pub async fn stop_recording(&mut self) -> ChatResult<Message> {
        let clip = self.recorder.stop().await?;
        let attachment = Attachment {
            data: DataUrl::encode(&clip.content_type, &clip.bytes),
            kind: AttachmentKind::Audio,
            caption: None,
        };
        let message = Message::user_attachment(attachment, self.next_timestamp());
        self.append_and_persist(message).await
    }

    /// The in-memory history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Whether a recording session is active.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// The seller this store is attached to, if any.
    #[must_use]
    pub const fn seller(&self) -> Option<&SellerId> {
        self.seller.as_ref()
    }

    /// The session this store was opened under.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Creation timestamp for the next message, clamped so history order
    /// stays non-decreasing even if the system clock steps backwards.
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.history
            .last()
            .map_or(now, |last| now.max(last.timestamp_ms))
    }

    async fn append_and_persist(&mut self, message: Message) -> ChatResult<Message> {
        let Some(seller) = self.seller.as_ref() else {
            return Err(ChatError::NoConversation);
        };
        let key = seller.storage_key(&self.config.history.key_prefix);

        self.history.push(message.clone());
        let encoded = match encode_history(&self.history) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.history.pop();
                return Err(err);
            }
        };
        if let Err(err) = self.kv.put(&key, encoded).await {
            self.history.pop();
            return Err(err);
        }

        debug!("appended message under {key} ({} total)", self.history.len());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::chat::attachments::AttachmentFuture;
    use crate::chat::capture::{AudioStream, CaptureFuture};
    use crate::chat::core::ids::UserId;
    use crate::chat::core::message::{MessageBody, Sender};
    use crate::chat::storage::kv::{KvFuture, MemoryConversationKv};

    struct FakeMicrophone {
        chunks: Vec<Vec<u8>>,
        deny: bool,
    }

    impl MicrophoneCapture for FakeMicrophone {
        fn open(&self) -> CaptureFuture<'_, ChatResult<Box<dyn AudioStream>>> {
            Box::pin(async move {
                if self.deny {
                    return Err(ChatError::CaptureDenied("permission denied".to_string()));
                }
                Ok(Box::new(FakeStream {
                    chunks: VecDeque::from(self.chunks.clone()),
                }) as Box<dyn AudioStream>)
            })
        }
    }

    struct FakeStream {
        chunks: VecDeque<Vec<u8>>,
    }

    impl AudioStream for FakeStream {
        fn content_type(&self) -> &str {
            "audio/webm"
        }

        fn next_chunk(&mut self) -> CaptureFuture<'_, ChatResult<Option<Vec<u8>>>> {
            Box::pin(async move { Ok(self.chunks.pop_front()) })
        }
    }

    struct FakeFile {
        bytes: Vec<u8>,
        content_type: String,
        fail: bool,
    }

    impl AttachmentSource for FakeFile {
        fn content_type(&self) -> &str {
            &self.content_type
        }

        fn read(&self) -> AttachmentFuture<'_, ChatResult<Vec<u8>>> {
            Box::pin(async move {
                if self.fail {
                    return Err(ChatError::AttachmentUnreadable("device gone".to_string()));
                }
                Ok(self.bytes.clone())
            })
        }
    }

    struct FailingKv;

    impl ConversationKv for FailingKv {
        fn get(&self, _key: &str) -> KvFuture<'_, ChatResult<Option<String>>> {
            Box::pin(async move { Ok(None) })
        }

        fn put(&self, _key: &str, _value: String) -> KvFuture<'_, ChatResult<()>> {
            Box::pin(async move { Err(ChatError::Storage("kv put failed".to_string())) })
        }
    }

    fn store_over(kv: Arc<dyn ConversationKv>) -> ChatResult<ConversationStore> {
        store_with_microphone(
            kv,
            Arc::new(FakeMicrophone {
                chunks: vec![b"voice".to_vec()],
                deny: false,
            }),
        )
    }

    fn store_with_microphone(
        kv: Arc<dyn ConversationKv>,
        microphone: Arc<dyn MicrophoneCapture>,
    ) -> ChatResult<ConversationStore> {
        ConversationStore::new(
            ChatConfig::default(),
            SessionContext::new(UserId::new("u1")?),
            ChatBackends { kv, microphone },
        )
    }

    #[tokio::test]
    async fn test_send_text_then_reload_round_trip() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());

        let mut store = store_over(Arc::clone(&kv))?;
        store.load(Some(SellerId::new("s1")?)).await?;
        let sent = store.send_text("hello").await?;
        assert!(sent.is_some());
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].sender, Sender::User);
        assert_eq!(store.history()[0].text(), Some("hello"));
        assert!(kv.get("chat_s1").await?.is_some());

        // Simulated restart: a fresh store over the unchanged backend.
        let mut restored = store_over(Arc::clone(&kv))?;
        let outcome = restored.load(Some(SellerId::new("s1")?)).await?;
        assert_eq!(outcome, LoadOutcome::Restored { messages: 1 });
        assert_eq!(restored.history(), store.history());

        // Empty input is rejected locally, history unchanged.
        assert!(restored.send_text("").await?.is_none());
        assert_eq!(restored.history().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_whitespace_only_body_is_a_noop() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(Arc::clone(&kv))?;
        store.load(Some(SellerId::new("s1")?)).await?;

        assert!(store.send_text("   ").await?.is_none());
        assert!(store.history().is_empty());
        assert_eq!(kv.get("chat_s1").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_is_idempotent() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(Arc::clone(&kv))?;
        store.load(Some(SellerId::new("s1")?)).await?;
        store.send_text("one").await?;
        store.send_text("two").await?;

        let first = store.load(Some(SellerId::new("s1")?)).await?;
        let snapshot = store.history().to_vec();
        let second = store.load(Some(SellerId::new("s1")?)).await?;
        assert_eq!(first, second);
        assert_eq!(store.history(), snapshot.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_key_restores_empty() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(kv)?;
        let outcome = store.load(Some(SellerId::new("nobody")?)).await?;
        assert_eq!(outcome, LoadOutcome::Restored { messages: 0 });
        assert!(store.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_payload_recovers_empty() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        kv.put("chat_s1", "{{{ not json".to_string()).await?;

        let mut store = store_over(kv)?;
        let outcome = store.load(Some(SellerId::new("s1")?)).await?;
        assert_eq!(outcome, LoadOutcome::Recovered);
        assert!(store.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_detached_store_rejects_sends() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(kv)?;
        let outcome = store.load(None).await?;
        assert_eq!(outcome, LoadOutcome::Detached);
        assert!(store.seller().is_none());

        let result = store.send_text("hi").await;
        assert!(matches!(result, Err(ChatError::NoConversation)));
        assert!(store.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_appends_are_ordered_and_tail_only() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(kv)?;
        store.load(Some(SellerId::new("s1")?)).await?;

        for body in ["a", "b", "c"] {
            let before = store.history().to_vec();
            store.send_text(body).await?;
            assert_eq!(store.history().len(), before.len() + 1);
            assert_eq!(&store.history()[..before.len()], before.as_slice());
            assert_eq!(store.history()[before.len()].text(), Some(body));
        }

        let stamps: Vec<i64> = store.history().iter().map(|m| m.timestamp_ms).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
        Ok(())
    }

    #[tokio::test]
    async fn test_send_file_embeds_declared_mime() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(Arc::clone(&kv))?;
        store.load(Some(SellerId::new("s1")?)).await?;

        let file = FakeFile {
            bytes: b"png".to_vec(),
            content_type: "image/png".to_string(),
            fail: false,
        };
        let message = store.send_file(&file).await?;
        let Some(attachment) = message.attachment() else {
            unreachable!("file sends produce attachments");
        };
        assert_eq!(attachment.kind, AttachmentKind::File("image/png".to_string()));
        assert!(attachment.data.as_str().starts_with("data:image/png;base64,"));
        assert!(kv.get("chat_s1").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_file_read_appends_nothing() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(kv)?;
        store.load(Some(SellerId::new("s1")?)).await?;

        let file = FakeFile {
            bytes: Vec::new(),
            content_type: "image/png".to_string(),
            fail: true,
        };
        let result = store.send_file(&file).await;
        assert!(matches!(result, Err(ChatError::AttachmentUnreadable(_))));
        assert!(store.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_recorded_audio_persists_audio_kind() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(Arc::clone(&kv))?;
        store.load(Some(SellerId::new("s1")?)).await?;

        store.start_recording().await?;
        assert!(store.is_recording());
        let message = store.stop_recording().await?;
        assert!(!store.is_recording());

        let Some(attachment) = message.attachment() else {
            unreachable!("recordings produce attachments");
        };
        assert_eq!(attachment.kind, AttachmentKind::Audio);
        assert!(attachment.data.as_str().starts_with("data:audio/webm;base64,"));

        let Some(raw) = kv.get("chat_s1").await? else {
            unreachable!("history was persisted");
        };
        assert!(raw.contains("\"fileType\":\"audio\""));
        Ok(())
    }

    #[tokio::test]
    async fn test_denied_microphone_leaves_store_idle() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_with_microphone(
            kv,
            Arc::new(FakeMicrophone {
                chunks: Vec::new(),
                deny: true,
            }),
        )?;
        store.load(Some(SellerId::new("s1")?)).await?;

        let result = store.start_recording().await;
        assert!(matches!(result, Err(ChatError::CaptureDenied(_))));
        assert!(!store.is_recording());
        assert!(store.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_put_rolls_back_append() -> ChatResult<()> {
        let mut store = store_over(Arc::new(FailingKv))?;
        store.load(Some(SellerId::new("s1")?)).await?;

        let result = store.send_text("hello").await;
        assert!(matches!(result, Err(ChatError::Storage(_))));
        assert!(store.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_send_clears_draft() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        let mut store = store_over(kv)?;
        store.load(Some(SellerId::new("s1")?)).await?;

        store.update_draft("hello");
        assert_eq!(store.draft(), "hello");
        let sent = store.send_draft().await?;
        assert!(sent.is_some());
        assert_eq!(store.draft(), "");

        // An empty draft sends nothing and stays empty.
        assert!(store.send_draft().await?.is_none());
        assert_eq!(store.history().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reload_keeps_seller_messages() -> ChatResult<()> {
        let kv: Arc<dyn ConversationKv> = Arc::new(MemoryConversationKv::new());
        kv.put(
            "chat_s1",
            r#"[{"text":"still available","sender":"seller","timestamp":50}]"#.to_string(),
        )
        .await?;

        let mut store = store_over(kv)?;
        store.load(Some(SellerId::new("s1")?)).await?;
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].sender, Sender::Seller);

        // A user reply lands after the migrated seller message.
        store.send_text("is it?").await?;
        assert_eq!(store.history().len(), 2);
        assert!(matches!(store.history()[1].body, MessageBody::Text(_)));
        Ok(())
    }
}
