//! Microphone capture seam.

use std::future::Future;
use std::pin::Pin;

use crate::chat::core::errors::ChatResult;

/// Boxed future type for capture operations.
pub type CaptureFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Access to the platform microphone.
pub trait MicrophoneCapture: Send + Sync {
    /// Request microphone access and begin capturing.
    ///
    /// # Errors
    /// Returns [`crate::chat::ChatError::CaptureDenied`] when the user or
    /// platform refuses access.
    fn open(&self) -> CaptureFuture<'_, ChatResult<Box<dyn AudioStream>>>;
}

/// A live capture session producing encoded audio chunks.
///
/// Chunks are pulled until the stream reports `None`; dropping the stream
/// ends the capture.
pub trait AudioStream: Send {
    /// MIME type of the encoded chunks (e.g. `audio/webm`).
    fn content_type(&self) -> &str;

    /// Pull the next captured chunk, `None` once capture has ended.
    ///
    /// # Errors
    /// Returns an error if the capture device fails mid-session.
    fn next_chunk(&mut self) -> CaptureFuture<'_, ChatResult<Option<Vec<u8>>>>;
}
