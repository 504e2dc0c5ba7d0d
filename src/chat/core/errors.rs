//! Error types for the chat subsystem.

use thiserror::Error;

/// Chat subsystem error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Invalid seller or user identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
    /// No seller conversation is attached to the store.
    #[error("no active conversation")]
    NoConversation,
    /// Microphone access was refused by the capture collaborator.
    #[error("microphone access denied: {0}")]
    CaptureDenied(String),
    /// A recording session is already active.
    #[error("a recording session is already active")]
    CaptureBusy,
    /// No recording session is active.
    #[error("no recording session is active")]
    CaptureIdle,
    /// The selected attachment could not be read.
    #[error("attachment unreadable: {0}")]
    AttachmentUnreadable(String),
    /// Generic key-value backend failure.
    #[error("storage error: {0}")]
    Storage(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
