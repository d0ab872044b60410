//! Capability boundary between the recording glue and the platform.
//!
//! Everything that actually touches hardware, encodes audio or hands out
//! resolvable URLs sits behind one of these traits. The native platform in
//! [`super::native`] implements them with cpal and hound; tests plug in fakes.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use super::blob::Blob;
use super::error::CaptureError;
use super::options::{MediaConstraints, RecordingOptions};

/// Shape of the interleaved samples a stream produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Consumer attached to a live stream (recorders, analysis nodes).
///
/// Called from the capture thread with interleaved `f32` samples in [-1, 1].
pub trait FrameSink: Send + Sync {
    fn consume(&self, samples: &[f32], format: StreamFormat);
}

/// Requests live input streams from a microphone.
#[async_trait]
pub trait CaptureCapability: Send + Sync {
    /// Whether the environment exposes capture at all. Evaluated once when
    /// the capability is constructed.
    fn is_supported(&self) -> bool;

    /// Asks for an input stream. Suspends until the platform grants or
    /// denies access.
    async fn request_stream(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError>;
}

/// A granted input stream.
pub trait MediaStream: Send {
    fn format(&self) -> StreamFormat;

    /// Routes every subsequent buffer to `sink` as well.
    fn connect(&mut self, sink: Arc<dyn FrameSink>);

    /// Stops all hardware tracks. Idempotent.
    fn stop_tracks(&mut self);

    fn is_live(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
    Paused,
}

/// Notifications a recorder delivers from its own thread.
///
/// A recorder sends every pending `DataAvailable` before its single `Stop`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    DataAvailable(Blob),
    Stop,
    Error(String),
}

/// Encodes a connected stream into container chunks.
pub trait MediaRecorder: Send + Sync {
    fn mime_type(&self) -> &str;

    fn state(&self) -> RecorderState;

    /// Starts encoding, emitting a chunk every `timeslice` of audio.
    fn start(&self, timeslice: Duration) -> Result<(), CaptureError>;

    fn pause(&self);

    fn resume(&self);

    /// Flushes remaining data and emits `Stop`.
    fn stop(&self);
}

/// Builds recorders and reports which containers they can produce.
pub trait RecorderFactory: Send + Sync {
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Container used when the requested one is unsupported.
    fn default_mime_type(&self) -> &str;

    /// Creates a recorder attached to `stream`. `options.mime_type` must be
    /// supported.
    fn create(
        &self,
        stream: &mut dyn MediaStream,
        options: &RecordingOptions,
        events: UnboundedSender<RecorderEvent>,
    ) -> Result<Arc<dyn MediaRecorder>, CaptureError>;
}

/// Hands out resolvable URLs for finished payloads.
pub trait BlobStore: Send + Sync {
    fn create_object_url(&self, blob: &Blob) -> Result<String, CaptureError>;

    fn revoke_object_url(&self, url: &str);
}

/// Blocking user-facing notice.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Notifier that only logs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        tracing::warn!("Notice: {}", message);
    }
}

/// The set of capabilities a recorder runs against.
#[derive(Clone)]
pub struct Platform {
    pub capture: Arc<dyn CaptureCapability>,
    pub recorders: Arc<dyn RecorderFactory>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
}
