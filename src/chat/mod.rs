//! Chat subsystem for the marketplace client.
//!
//! One open seller conversation at a time, organized into:
//! - `core`: Configuration, errors, IDs, and the message model
//! - `storage`: Key-value backends and the persisted history codec
//! - `attachments`: File sources and embeddable data references
//! - `capture`: Microphone seam and the recording state machine
//! - `engine`: The conversation store orchestrating all of the above

pub mod attachments;
pub mod capture;
pub mod core;
pub mod engine;
pub mod storage;

// Re-export commonly used types for convenience
pub use attachments::{AttachmentFuture, AttachmentSource, DataUrl, FileAttachment};
pub use capture::{AudioClip, AudioStream, CaptureFuture, MicrophoneCapture, Recorder};
pub use core::{
    Attachment, AttachmentKind, ChatConfig, ChatError, ChatResult, HistoryConfig, Message,
    MessageBody, SellerId, Sender, SenderParseError, SessionContext, StorageConfig, UserId,
};
pub use engine::{ChatBackends, ConversationStore, LoadOutcome};
pub use storage::{
    ConversationKv, DecodedHistory, KvFuture, MemoryConversationKv, SqliteConversationKv,
    decode_history, encode_history, HISTORY_SCHEMA_VERSION,
};
