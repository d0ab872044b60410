//! Native capture capability backed by cpal.
//!
//! Each granted stream owns a dedicated thread that builds and plays the cpal
//! input stream and keeps it alive until the stream's tracks are stopped.
//! Buffers are converted to `f32` and handed to every connected sink from the
//! audio callback.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

use super::blob::FileBlobStore;
use super::capability::{
    CaptureCapability, FrameSink, MediaStream, Notifier, Platform, StreamFormat,
};
use super::encoder::WavRecorderFactory;
use super::error::CaptureError;
use super::options::MediaConstraints;

type SinkList = Arc<Mutex<Vec<Arc<dyn FrameSink>>>>;

/// Microphone access through the default cpal host.
pub struct CpalCapture {
    /// "default", a device name, or a numeric index from `list-devices`
    device: String,
    supported: bool,
}

impl CpalCapture {
    /// Probes the host once for any input device.
    pub fn detect(device: impl Into<String>) -> Self {
        let supported = suppress_alsa_warnings(|| {
            cpal::default_host()
                .input_devices()
                .map(|mut devices| devices.next().is_some())
                .unwrap_or(false)
        });

        if !supported {
            tracing::warn!("No audio input devices detected");
        }

        Self {
            device: device.into(),
            supported,
        }
    }
}

#[async_trait]
impl CaptureCapability for CpalCapture {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request_stream(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let sinks: SinkList = Arc::new(Mutex::new(Vec::new()));

        let device = self.device.clone();
        let thread_sinks = Arc::clone(&sinks);
        let thread = std::thread::Builder::new()
            .name("micwave-capture".to_string())
            .spawn(move || match open_input_stream(&device, constraints, thread_sinks) {
                Ok((stream, format)) => {
                    let _ = ready_tx.send(Ok(format));
                    // Returns on an explicit stop or when the stream handle is dropped.
                    let _ = stop_rx.recv();
                    drop(stream);
                    tracing::debug!("Capture thread released its input stream");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| CaptureError::Acquisition(format!("failed to spawn capture thread: {e}")))?;

        let format = ready_rx
            .await
            .map_err(|_| CaptureError::Acquisition("capture thread exited".to_string()))??;

        Ok(Box::new(CpalStream {
            format,
            sinks,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }))
    }
}

/// Live cpal input stream.
pub struct CpalStream {
    format: StreamFormat,
    sinks: SinkList,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MediaStream for CpalStream {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn connect(&mut self, sink: Arc<dyn FrameSink>) {
        self.sinks.lock().push(sink);
    }

    fn stop_tracks(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Capture thread panicked");
            }
        }
        self.sinks.lock().clear();
    }

    fn is_live(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// Opens and starts the input stream. Runs on the capture thread.
fn open_input_stream(
    device_spec: &str,
    constraints: MediaConstraints,
    sinks: SinkList,
) -> Result<(cpal::Stream, StreamFormat), CaptureError> {
    let device = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        if device_spec == "default" {
            host.default_input_device()
                .ok_or_else(|| CaptureError::Acquisition("No audio input device available".to_string()))
        } else {
            find_device(&host, device_spec)
        }
    })?;

    let device_name = device
        .name()
        .unwrap_or_else(|_| "Unknown device".to_string());
    tracing::info!("Recording device: {}", device_name);

    let sound = constraints.audio;
    if sound.echo_cancellation || sound.auto_gain_control || sound.noise_suppression {
        tracing::debug!(
            "Input processing (echo cancellation={}, auto gain={}, noise suppression={}) is not available on this host; capturing raw input",
            sound.echo_cancellation,
            sound.auto_gain_control,
            sound.noise_suppression
        );
    }

    let default_config = device
        .default_input_config()
        .map_err(|e| CaptureError::Acquisition(e.to_string()))?;
    let default_rate = default_config.sample_rate();

    let config = device
        .supported_input_configs()
        .ok()
        .and_then(|mut configs| {
            configs.find(|c| {
                c.channels() == sound.channel_count
                    && c.min_sample_rate() <= default_rate
                    && default_rate <= c.max_sample_rate()
            })
        })
        .map(|range| range.with_sample_rate(default_rate))
        .unwrap_or_else(|| {
            tracing::warn!(
                "Device has no {}-channel configuration; using {} channels",
                sound.channel_count,
                default_config.channels()
            );
            default_config
        });

    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();
    let format = StreamFormat {
        sample_rate: stream_config.sample_rate.0,
        channels: stream_config.channels,
    };

    tracing::debug!(
        "Device configuration: {}Hz, {} channels, {:?}",
        format.sample_rate,
        format.channels,
        sample_format
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, sinks, format),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, sinks, format),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, sinks, format),
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, sinks, format),
        other => {
            return Err(CaptureError::Acquisition(format!(
                "Unsupported sample format {other:?}"
            )))
        }
    }
    .map_err(|e| CaptureError::Acquisition(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::Acquisition(e.to_string()))?;

    tracing::debug!("Audio stream started");
    Ok((stream, format))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sinks: SinkList,
    format: StreamFormat,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
            for sink in sinks.lock().iter() {
                sink.consume(&samples, format);
            }
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    )
}

/// Finds an input device by name or numeric index.
fn find_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, CaptureError> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| CaptureError::Acquisition(format!("Failed to enumerate devices: {e}")))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            CaptureError::Acquisition(format!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().map(|n| n == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            CaptureError::Acquisition(format!(
                "Audio input device '{device_spec}' not found. Use 'micwave list-devices' to see available devices."
            ))
        })
}

/// Summary of one input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
    /// Default sample rate and channel count, when the device reports one.
    pub default_config: Option<(u32, u16)>,
}

/// Lists input devices on the default host.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, CaptureError> {
    suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::Acquisition(format!("Failed to enumerate audio devices: {e}")))?;

        Ok(devices
            .filter_map(|device| device.name().ok().map(|name| (device, name)))
            .enumerate()
            .map(|(index, (device, name))| InputDeviceInfo {
                index,
                is_default: default_name.as_ref() == Some(&name),
                default_config: device
                    .default_input_config()
                    .ok()
                    .map(|c| (c.sample_rate().0, c.channels())),
                name,
            })
            .collect())
    })
}

/// Platform backed by cpal capture, the WAV recorder and files under `recordings_dir`.
pub fn native_platform(
    device: &str,
    recordings_dir: PathBuf,
    notifier: Arc<dyn Notifier>,
) -> Platform {
    Platform {
        capture: Arc::new(CpalCapture::detect(device)),
        recorders: Arc::new(WavRecorderFactory),
        blobs: Arc::new(FileBlobStore::new(recordings_dir)),
        notifier,
    }
}

/// Runs `f` with stderr pointed at /dev/null so ALSA's probing noise stays
/// off the terminal. Falls back to running `f` unchanged if redirection fails.
#[cfg(target_os = "linux")]
fn suppress_alsa_warnings<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    let Ok(dev_null) = OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };

    let saved_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved_stderr == -1 {
        return f();
    }
    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(saved_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(saved_stderr, libc::STDERR_FILENO);
        libc::close(saved_stderr);
    }
    result
}

#[cfg(not(target_os = "linux"))]
fn suppress_alsa_warnings<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    f()
}
