//! Microphone seam and the recording state machine.

pub mod microphone;
pub mod recorder;

pub use microphone::{AudioStream, CaptureFuture, MicrophoneCapture};
pub use recorder::{AudioClip, Recorder};
