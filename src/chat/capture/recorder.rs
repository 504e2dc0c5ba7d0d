//! Two-state recording machine over the microphone seam.

use tracing::debug;

use crate::chat::capture::microphone::{AudioStream, MicrophoneCapture};
use crate::chat::core::errors::{ChatError, ChatResult};

/// A finished recording: concatenated chunks plus their MIME type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AudioClip {
    /// Concatenated encoded audio.
    pub bytes: Vec<u8>,
    /// MIME type reported by the capture stream.
    pub content_type: String,
}

/// Chunks captured so far, owned exclusively by the active session.
struct RecordingSession {
    stream: Box<dyn AudioStream>,
    chunks: Vec<Vec<u8>>,
}

enum RecorderState {
    Idle,
    Recording(RecordingSession),
}

/// Guarded `Idle`/`Recording` state machine.
///
/// Exactly one session may be active; starting while recording and
/// stopping while idle are both rejected rather than left undefined.
pub struct Recorder {
    state: RecorderState,
}

impl Recorder {
    /// Create an idle recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RecorderState::Idle,
        }
    }

    /// Whether a recording session is active.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording(_))
    }

    /// Transition `Idle → Recording` by opening the microphone.
    ///
    /// # Errors
    /// [`ChatError::CaptureBusy`] when already recording (the active
    /// session is untouched); [`ChatError::CaptureDenied`] when the
    /// collaborator refuses access, in which case the recorder stays idle.
    pub async fn start(&mut self, microphone: &dyn MicrophoneCapture) -> ChatResult<()> {
        if self.is_recording() {
            return Err(ChatError::CaptureBusy);
        }

        let stream = microphone.open().await?;
        debug!("recording started ({})", stream.content_type());
        self.state = RecorderState::Recording(RecordingSession {
            stream,
            chunks: Vec::new(),
        });
        Ok(())
    }

    /// Transition `Recording → Idle`, draining the stream's remaining
    /// chunks and concatenating them into a clip.
    ///
    /// # Errors
    /// [`ChatError::CaptureIdle`] when no session is active; a device
    /// failure mid-drain discards the session and surfaces the error, so
    /// no partial clip is ever produced.
    pub async fn stop(&mut self) -> ChatResult<AudioClip> {
        let state = std::mem::replace(&mut self.state, RecorderState::Idle);
        let RecorderState::Recording(mut session) = state else {
            return Err(ChatError::CaptureIdle);
        };

        while let Some(chunk) = session.stream.next_chunk().await? {
            session.chunks.push(chunk);
        }

        let clip = AudioClip {
            bytes: session.chunks.concat(),
            content_type: session.stream.content_type().to_string(),
        };
        debug!(
            "recording stopped ({} chunks, {} bytes)",
            session.chunks.len(),
            clip.bytes.len()
        );
        Ok(clip)
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
