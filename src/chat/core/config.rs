//! Configuration for the chat subsystem.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// Top-level configuration for the conversation store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Key-value storage settings.
    pub storage: StorageConfig,
    /// History layout settings.
    pub history: HistoryConfig,
}

impl ChatConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.storage.table.is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.table must not be empty".to_string(),
            ));
        }

        // The table name is spliced into SQL statements.
        if !self
            .storage
            .table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ChatError::InvalidConfig(format!(
                "storage.table must be alphanumeric/underscore, got {:?}",
                self.storage.table
            )));
        }

        if self.history.key_prefix.is_empty() {
            return Err(ChatError::InvalidConfig(
                "history.key_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Key-value storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the `SQLite` database file.
    pub sqlite_path: PathBuf,
    /// Table holding one row per conversation key.
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("souq_chat.sqlite3"),
            table: "conversations".to_string(),
        }
    }
}

/// History layout settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Prefix prepended to the seller id to form the storage key.
    pub key_prefix: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            key_prefix: "chat_".to_string(),
        }
    }
}
