//! Key-value backends: one string value per conversation key.

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use dashmap::DashMap;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::chat::core::config::StorageConfig;
use crate::chat::core::errors::ChatResult;

/// Boxed future type for key-value operations.
pub type KvFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Local persistent key-value store, partitioned by conversation key.
pub trait ConversationKv: Send + Sync {
    /// Read the value under `key`, if any.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get(&self, key: &str) -> KvFuture<'_, ChatResult<Option<String>>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn put(&self, key: &str, value: String) -> KvFuture<'_, ChatResult<()>>;
}

/// `SQLite` implementation of the key-value store.
pub struct SqliteConversationKv {
    conn: Connection,
    table: String,
}

impl SqliteConversationKv {
    /// Open the database and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(config: &StorageConfig) -> ChatResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(conn, config.table.clone()).await
    }

    /// Initialize over an existing connection.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn with_connection(conn: Connection, table: String) -> ChatResult<Self> {
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_updated
                    ON {table_name} (updated_at DESC);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl ConversationKv for SqliteConversationKv {
    fn get(&self, key: &str) -> KvFuture<'_, ChatResult<Option<String>>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let value = self
                .conn
                .call(move |conn| {
                    let value = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE key = ?1"),
                            rusqlite::params![key],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(value)
                })
                .await?;
            Ok(value)
        })
    }

    fn put(&self, key: &str, value: String) -> KvFuture<'_, ChatResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let now_ms = Utc::now().timestamp_millis();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (key, value, updated_at)
                             VALUES (?1, ?2, ?3)
                             ON CONFLICT(key) DO UPDATE SET
                                 value = excluded.value,
                                 updated_at = excluded.updated_at"
                        ),
                        rusqlite::params![key, value, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

/// In-memory implementation for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryConversationKv {
    entries: DashMap<String, String>,
}

impl MemoryConversationKv {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationKv for MemoryConversationKv {
    fn get(&self, key: &str) -> KvFuture<'_, ChatResult<Option<String>>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.entries.get(&key).map(|entry| entry.value().clone())) })
    }

    fn put(&self, key: &str, value: String) -> KvFuture<'_, ChatResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            self.entries.insert(key, value);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_put_get_round_trip() -> ChatResult<()> {
        let conn = Connection::open_in_memory().await?;
        let kv = SqliteConversationKv::with_connection(conn, "conversations".to_string()).await?;

        assert_eq!(kv.get("chat_s1").await?, None);

        kv.put("chat_s1", "[1]".to_string()).await?;
        assert_eq!(kv.get("chat_s1").await?.as_deref(), Some("[1]"));

        kv.put("chat_s1", "[1,2]".to_string()).await?;
        assert_eq!(kv.get("chat_s1").await?.as_deref(), Some("[1,2]"));
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_keys_are_partitioned() -> ChatResult<()> {
        let conn = Connection::open_in_memory().await?;
        let kv = SqliteConversationKv::with_connection(conn, "conversations".to_string()).await?;

        kv.put("chat_a", "a".to_string()).await?;
        kv.put("chat_b", "b".to_string()).await?;
        assert_eq!(kv.get("chat_a").await?.as_deref(), Some("a"));
        assert_eq!(kv.get("chat_b").await?.as_deref(), Some("b"));
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_put_get_round_trip() -> ChatResult<()> {
        let kv = MemoryConversationKv::new();
        assert_eq!(kv.get("chat_s1").await?, None);
        kv.put("chat_s1", "payload".to_string()).await?;
        assert_eq!(kv.get("chat_s1").await?.as_deref(), Some("payload"));
        Ok(())
    }
}
