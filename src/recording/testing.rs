//! In-memory capabilities for exercising the controller and widget.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;

use super::blob::{Blob, MemoryBlobStore, ResultArtifact};
use super::capability::{
    CaptureCapability, FrameSink, MediaRecorder, MediaStream, Notifier, Platform, RecorderEvent,
    RecorderFactory, RecorderState, StreamFormat,
};
use super::controller::RecorderCallbacks;
use super::encoder::WavRecorderFactory;
use super::error::CaptureError;
use super::options::{MediaConstraints, RecordingOptions};

pub const FAKE_FORMAT: StreamFormat = StreamFormat {
    sample_rate: 48_000,
    channels: 1,
};

#[derive(Default)]
struct StreamShared {
    sinks: Mutex<Vec<Arc<dyn FrameSink>>>,
    live: AtomicBool,
}

pub struct FakeStream {
    shared: Arc<StreamShared>,
}

impl MediaStream for FakeStream {
    fn format(&self) -> StreamFormat {
        FAKE_FORMAT
    }

    fn connect(&mut self, sink: Arc<dyn FrameSink>) {
        self.shared.sinks.lock().push(sink);
    }

    fn stop_tracks(&mut self) {
        self.shared.live.store(false, Ordering::SeqCst);
        self.shared.sinks.lock().clear();
    }

    fn is_live(&self) -> bool {
        self.shared.live.load(Ordering::SeqCst)
    }
}

pub struct FakeCapture {
    supported: bool,
    grant: bool,
    gate: Option<Notify>,
    requests: AtomicUsize,
    streams: Mutex<Vec<Arc<StreamShared>>>,
}

impl FakeCapture {
    fn new(supported: bool, grant: bool, gated: bool) -> Self {
        Self {
            supported,
            grant,
            gate: gated.then(Notify::new),
            requests: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Lets one pending request complete.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn granted(&self) -> usize {
        self.streams.lock().len()
    }

    /// Feeds samples into the most recently granted stream if it is live.
    pub fn push_latest(&self, samples: &[f32]) {
        let Some(shared) = self.streams.lock().last().cloned() else {
            return;
        };
        if !shared.live.load(Ordering::SeqCst) {
            return;
        }
        let sinks: Vec<_> = shared.sinks.lock().clone();
        for sink in sinks {
            sink.consume(samples, FAKE_FORMAT);
        }
    }

    pub fn latest_is_live(&self) -> bool {
        self.streams
            .lock()
            .last()
            .is_some_and(|s| s.live.load(Ordering::SeqCst))
    }

    pub fn live_streams(&self) -> usize {
        self.streams
            .lock()
            .iter()
            .filter(|s| s.live.load(Ordering::SeqCst))
            .count()
    }
}

#[async_trait]
impl CaptureCapability for FakeCapture {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request_stream(
        &self,
        _constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.grant {
            return Err(CaptureError::Acquisition("Permission denied".to_string()));
        }

        let shared = Arc::new(StreamShared::default());
        shared.live.store(true, Ordering::SeqCst);
        self.streams.lock().push(Arc::clone(&shared));
        Ok(Box::new(FakeStream { shared }))
    }
}

const SHORT_MIME_TYPE: &str = "audio/ogg";

/// Recorder that emits one chunk and then ends on its own, like a device
/// that disappears right after the session starts.
struct ShortLivedRecorder {
    events: UnboundedSender<RecorderEvent>,
    state: Mutex<RecorderState>,
}

impl MediaRecorder for ShortLivedRecorder {
    fn mime_type(&self) -> &str {
        SHORT_MIME_TYPE
    }

    fn state(&self) -> RecorderState {
        *self.state.lock()
    }

    fn start(&self, _timeslice: Duration) -> Result<(), CaptureError> {
        let chunk = Blob::new(vec![1u8, 2, 3, 4], SHORT_MIME_TYPE);
        let _ = self.events.send(RecorderEvent::DataAvailable(chunk));
        let _ = self.events.send(RecorderEvent::Stop);
        *self.state.lock() = RecorderState::Inactive;
        Ok(())
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn stop(&self) {}
}

pub struct ShortLivedRecorderFactory;

impl RecorderFactory for ShortLivedRecorderFactory {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_type == SHORT_MIME_TYPE
    }

    fn default_mime_type(&self) -> &str {
        SHORT_MIME_TYPE
    }

    fn create(
        &self,
        _stream: &mut dyn MediaStream,
        _options: &RecordingOptions,
        events: UnboundedSender<RecorderEvent>,
    ) -> Result<Arc<dyn MediaRecorder>, CaptureError> {
        Ok(Arc::new(ShortLivedRecorder {
            events,
            state: Mutex::new(RecorderState::Recording),
        }))
    }
}

#[derive(Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<String>>,
}

impl Notifier for CollectingNotifier {
    fn alert(&self, message: &str) {
        self.notices.lock().push(message.to_string());
    }
}

pub struct FakePlatform {
    pub capture: Arc<FakeCapture>,
    pub recorders: Arc<dyn RecorderFactory>,
    pub blobs: Arc<MemoryBlobStore>,
    pub notifier: Arc<CollectingNotifier>,
}

impl FakePlatform {
    fn with_capture(capture: FakeCapture) -> Self {
        Self {
            capture: Arc::new(capture),
            recorders: Arc::new(WavRecorderFactory),
            blobs: Arc::new(MemoryBlobStore::new()),
            notifier: Arc::new(CollectingNotifier::default()),
        }
    }

    pub fn granting() -> Self {
        Self::with_capture(FakeCapture::new(true, true, false))
    }

    pub fn denying() -> Self {
        Self::with_capture(FakeCapture::new(true, false, false))
    }

    pub fn unsupported() -> Self {
        Self::with_capture(FakeCapture::new(false, true, false))
    }

    /// Grants streams only after [`FakeCapture::release`].
    pub fn gated() -> Self {
        Self::with_capture(FakeCapture::new(true, true, true))
    }

    pub fn gated_denying() -> Self {
        Self::with_capture(FakeCapture::new(true, false, true))
    }

    /// Grants streams whose recorder ends right after starting.
    pub fn short_lived() -> Self {
        Self {
            recorders: Arc::new(ShortLivedRecorderFactory),
            ..Self::granting()
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            capture: self.capture.clone(),
            recorders: self.recorders.clone(),
            blobs: self.blobs.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn notices(&self) -> Vec<String> {
        self.notifier.notices.lock().clone()
    }
}

/// Records every callback invocation in order.
#[derive(Clone, Default)]
pub struct CallbackLog {
    order: Arc<Mutex<Vec<String>>>,
    stops: Arc<Mutex<Vec<ResultArtifact>>>,
    saves: Arc<Mutex<Vec<ResultArtifact>>>,
}

impl CallbackLog {
    pub fn callbacks(&self) -> RecorderCallbacks {
        let (start, data, stop, save) = (self.clone(), self.clone(), self.clone(), self.clone());
        RecorderCallbacks::default()
            .on_start(move || start.order.lock().push("start".to_string()))
            .on_data(move |_| data.order.lock().push("data".to_string()))
            .on_stop(move |artifact| {
                stop.order.lock().push("stop".to_string());
                stop.stops.lock().push(artifact);
            })
            .on_save(move |artifact| {
                save.order.lock().push("save".to_string());
                save.saves.lock().push(artifact);
            })
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    pub fn starts(&self) -> usize {
        self.count("start")
    }

    pub fn data_chunks(&self) -> usize {
        self.count("data")
    }

    fn count(&self, name: &str) -> usize {
        self.order.lock().iter().filter(|e| *e == name).count()
    }

    pub fn stops(&self) -> Vec<ResultArtifact> {
        self.stops.lock().clone()
    }

    pub fn saves(&self) -> Vec<ResultArtifact> {
        self.saves.lock().clone()
    }
}
