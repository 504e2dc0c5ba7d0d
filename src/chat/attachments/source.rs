//! File-selection seam: one chosen file per send.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Boxed future type for attachment reads.
pub type AttachmentFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A user-selected file the store can turn into an attachment message.
///
/// The read suspends; a failed read drops the pending message, it never
/// appends a partial one.
pub trait AttachmentSource: Send + Sync {
    /// Declared MIME type of the content.
    fn content_type(&self) -> &str;

    /// Read the full contents.
    ///
    /// # Errors
    /// Returns an error if the underlying bytes cannot be read.
    fn read(&self) -> AttachmentFuture<'_, ChatResult<Vec<u8>>>;
}

/// Filesystem-backed attachment source.
pub struct FileAttachment {
    path: PathBuf,
    content_type: String,
}

impl FileAttachment {
    /// Create a source for a file on disk with its declared MIME type.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
        }
    }
}

impl AttachmentSource for FileAttachment {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn read(&self) -> AttachmentFuture<'_, ChatResult<Vec<u8>>> {
        Box::pin(async move {
            tokio::fs::read(&self.path).await.map_err(|err| {
                ChatError::AttachmentUnreadable(format!("{}: {err}", self.path.display()))
            })
        })
    }
}
