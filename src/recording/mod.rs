//! Microphone recording for micwave.
//!
//! Capture controller, live analysis, the three visualizations and the
//! record-flag widget, plus the native platform and the terminal host.

pub mod analyser;
pub mod blob;
pub mod capability;
pub mod controller;
pub mod encoder;
pub mod error;
pub mod native;
pub mod options;
pub mod recording_history;
pub mod surface;
pub mod ui;
pub mod visualizations;
pub mod widget;

#[cfg(test)]
pub(crate) mod testing;

pub use analyser::{AnalyserNode, AudioContext, ContextState};
pub use blob::{ArtifactSummary, Blob, FileBlobStore, MemoryBlobStore, ResultArtifact};
pub use capability::{
    BlobStore, CaptureCapability, FrameSink, LogNotifier, MediaRecorder, MediaStream, Notifier,
    Platform, RecorderEvent, RecorderFactory, RecorderState, StreamFormat,
};
pub use controller::{MicrophoneRecorder, RecorderCallbacks, SessionCompletion, StartOutcome};
pub use encoder::{WavRecorder, WavRecorderFactory};
pub use error::{AnalyserError, CaptureError};
pub use native::{list_input_devices, native_platform, CpalCapture, InputDeviceInfo};
pub use options::{MediaConstraints, RecordingOptions, SoundOptions};
pub use recording_history::{RecordingHistory, RecordingMetadata};
pub use surface::{DisplayList, DrawCommand, Rgba, Surface};
pub use ui::{FooterStatus, MicwaveTui, RecordingCommand};
pub use visualizations::{VisualSetting, VisualizationDriver};
pub use widget::{MicWidget, WidgetProps, WidgetState};
