//! Chunked WAV recorder.
//!
//! Encodes connected stream buffers as 16-bit PCM WAV using hound and hands
//! the encoded bytes out in timeslice-sized chunks, the way a platform media
//! recorder does. The first chunk starts with the RIFF header; because the
//! header is written before the total length is known, the joined payload is
//! repaired with [`repair_wav_header`] when the session is assembled.

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use super::blob::Blob;
use super::capability::{
    FrameSink, MediaRecorder, MediaStream, RecorderEvent, RecorderFactory, RecorderState,
    StreamFormat,
};
use super::error::CaptureError;
use super::options::RecordingOptions;

pub const WAV_MIME_TYPE: &str = "audio/wav";

const WAV_MIME_TYPES: [&str; 3] = ["audio/wav", "audio/wave", "audio/x-wav"];

/// Whether `mime_type` names a WAV container. Codec parameters are ignored.
pub fn is_wav_mime(mime_type: &str) -> bool {
    let base = mime_type.split(';').next().unwrap_or("").trim();
    WAV_MIME_TYPES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(base))
}

/// Rewrites the RIFF and `data` chunk sizes to match the actual length.
///
/// Leaves anything that is not a RIFF/WAVE payload untouched.
pub fn repair_wav_header(bytes: &mut [u8]) {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return;
    }

    let riff_size = (bytes.len() - 8) as u32;
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        if id == b"data" {
            let data_size = (bytes.len() - offset - 8) as u32;
            bytes[offset + 4..offset + 8].copy_from_slice(&data_size.to_le_bytes());
            return;
        }

        let mut size_bytes = [0u8; 4];
        size_bytes.copy_from_slice(&bytes[offset + 4..offset + 8]);
        let size = u32::from_le_bytes(size_bytes) as usize;
        offset += 8 + size + (size & 1);
    }
}

/// In-memory sink shared between the hound writer and the chunk emitter.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Cursor<Vec<u8>>>>);

impl SharedBuffer {
    fn len(&self) -> usize {
        self.0.lock().get_ref().len()
    }

    fn slice_from(&self, start: usize) -> Vec<u8> {
        self.0.lock().get_ref()[start..].to_vec()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SharedBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.lock().seek(pos)
    }
}

struct EncoderState {
    state: RecorderState,
    writer: Option<WavWriter<SharedBuffer>>,
    buffer: SharedBuffer,
    /// Bytes of `buffer` already handed out as chunks.
    emitted: usize,
    timeslice_frames: usize,
    frames_since_emit: usize,
}

/// Records a stream into WAV chunks.
pub struct WavRecorder {
    format: StreamFormat,
    events: UnboundedSender<RecorderEvent>,
    inner: Mutex<EncoderState>,
}

impl WavRecorder {
    pub fn new(format: StreamFormat, events: UnboundedSender<RecorderEvent>) -> Self {
        Self {
            format,
            events,
            inner: Mutex::new(EncoderState {
                state: RecorderState::Inactive,
                writer: None,
                buffer: SharedBuffer::default(),
                emitted: 0,
                timeslice_frames: 1,
                frames_since_emit: 0,
            }),
        }
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Sends every byte written since the last chunk.
    fn emit_pending(&self, inner: &mut EncoderState) {
        if let Some(writer) = inner.writer.as_mut() {
            if let Err(e) = writer.flush() {
                tracing::error!("WAV flush failed: {}", e);
                let _ = self.events.send(RecorderEvent::Error(e.to_string()));
                return;
            }
        }

        let len = inner.buffer.len();
        if len > inner.emitted {
            let chunk = inner.buffer.slice_from(inner.emitted);
            inner.emitted = len;
            let _ = self
                .events
                .send(RecorderEvent::DataAvailable(Blob::new(chunk, WAV_MIME_TYPE)));
        }
        inner.frames_since_emit = 0;
    }
}

impl FrameSink for WavRecorder {
    fn consume(&self, samples: &[f32], format: StreamFormat) {
        let mut inner = self.inner.lock();
        if inner.state != RecorderState::Recording {
            return;
        }
        if format != self.format {
            tracing::warn!(
                "Dropping buffer with format {:?}, recorder expects {:?}",
                format,
                self.format
            );
            return;
        }

        let Some(writer) = inner.writer.as_mut() else {
            return;
        };
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            if let Err(e) = writer.write_sample(value) {
                tracing::error!("WAV encoding failed: {}", e);
                let _ = self.events.send(RecorderEvent::Error(e.to_string()));
                return;
            }
        }

        inner.frames_since_emit += samples.len() / self.format.channels.max(1) as usize;
        if inner.frames_since_emit >= inner.timeslice_frames {
            self.emit_pending(&mut inner);
        }
    }
}

impl MediaRecorder for WavRecorder {
    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn state(&self) -> RecorderState {
        self.inner.lock().state
    }

    fn start(&self, timeslice: Duration) -> Result<(), CaptureError> {
        let mut inner = self.inner.lock();
        if inner.state != RecorderState::Inactive {
            return Err(CaptureError::Recorder(
                "recorder is already running".to_string(),
            ));
        }

        let buffer = SharedBuffer::default();
        let writer = WavWriter::new(buffer.clone(), self.spec())
            .map_err(|e| CaptureError::Recorder(e.to_string()))?;

        let frames = self.format.sample_rate as u128 * timeslice.as_millis() / 1000;
        inner.timeslice_frames = (frames as usize).max(1);
        inner.frames_since_emit = 0;
        inner.emitted = 0;
        inner.buffer = buffer;
        inner.writer = Some(writer);
        inner.state = RecorderState::Recording;

        tracing::debug!(
            "WAV recorder started: {}Hz, {} channels, {} frames per chunk",
            self.format.sample_rate,
            self.format.channels,
            inner.timeslice_frames
        );
        Ok(())
    }

    fn pause(&self) {
        let mut inner = self.inner.lock();
        if inner.state == RecorderState::Recording {
            inner.state = RecorderState::Paused;
            tracing::debug!("Recorder paused");
        }
    }

    fn resume(&self) {
        let mut inner = self.inner.lock();
        if inner.state == RecorderState::Paused {
            inner.state = RecorderState::Recording;
            tracing::debug!("Recorder resumed");
        }
    }

    fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state == RecorderState::Inactive {
            return;
        }

        self.emit_pending(&mut inner);
        if let Some(writer) = inner.writer.take() {
            if let Err(e) = writer.finalize() {
                tracing::error!("WAV finalize failed: {}", e);
                let _ = self.events.send(RecorderEvent::Error(e.to_string()));
            }
        }
        inner.state = RecorderState::Inactive;

        tracing::debug!("Recorder stopped after {} bytes", inner.emitted);
        let _ = self.events.send(RecorderEvent::Stop);
    }
}

/// Builds [`WavRecorder`]s. WAV is the only container it can produce.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavRecorderFactory;

impl RecorderFactory for WavRecorderFactory {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        is_wav_mime(mime_type)
    }

    fn default_mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn create(
        &self,
        stream: &mut dyn MediaStream,
        options: &RecordingOptions,
        events: UnboundedSender<RecorderEvent>,
    ) -> Result<Arc<dyn MediaRecorder>, CaptureError> {
        if !self.is_type_supported(&options.mime_type) {
            return Err(CaptureError::UnsupportedFormat(options.mime_type.clone()));
        }

        let format = stream.format();
        let pcm_rate = format.sample_rate * format.channels as u32 * 16;
        if options.audio_bits_per_second != pcm_rate {
            tracing::debug!(
                "PCM output runs at {} bps; requested {} bps is ignored",
                pcm_rate,
                options.audio_bits_per_second
            );
        }

        let recorder = Arc::new(WavRecorder::new(format, events));
        stream.connect(recorder.clone());
        Ok(recorder)
    }
}
