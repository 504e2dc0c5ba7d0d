//! Persistence for conversation history.

pub mod codec;
pub mod kv;

pub use codec::{DecodedHistory, HISTORY_SCHEMA_VERSION, decode_history, encode_history};
pub use kv::{ConversationKv, KvFuture, MemoryConversationKv, SqliteConversationKv};
