//! Core chat types and identifiers.

pub mod config;
pub mod errors;
pub mod ids;
pub mod message;

pub use config::{ChatConfig, HistoryConfig, StorageConfig};
pub use errors::{ChatError, ChatResult};
pub use ids::{SellerId, SessionContext, UserId};
pub use message::{Attachment, AttachmentKind, Message, MessageBody, Sender, SenderParseError};
