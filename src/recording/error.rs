//! Error taxonomy for capture, recording and analysis.

use thiserror::Error;

/// Failures raised while acquiring or driving a capture session.
///
/// None of these cross the widget boundary: the widget logs them and, for
/// acquisition problems, surfaces a blocking notice instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The platform denied microphone access or could not open a device.
    #[error("Could not access the microphone: {0}")]
    Acquisition(String),

    /// The requested container format is not available.
    ///
    /// Non-fatal: the controller falls back to the platform default format.
    #[error("Recording format '{0}' is not supported")]
    UnsupportedFormat(String),

    /// The environment exposes no capture capability at all.
    #[error("This environment does not support audio recording")]
    EnvironmentUnsupported,

    /// The recorder failed to encode or finalize audio.
    #[error("Recorder failure: {0}")]
    Recorder(String),

    /// The finished payload could not be stored or given a URL.
    #[error("Could not store recording: {0}")]
    Blob(String),
}

/// Invalid analysis node configuration.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AnalyserError {
    #[error("FFT size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),
}
