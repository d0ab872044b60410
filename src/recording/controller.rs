//! Capture controller.
//!
//! Owns at most one active [`CaptureSession`] plus any sessions that have been
//! stopped but whose recorder has not yet delivered its final notifications.
//! Recorder notifications arrive on a per-session channel and are turned into
//! callbacks by [`MicrophoneRecorder::pump_events`] (or awaited directly by
//! [`MicrophoneRecorder::stop_and_wait`]).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tokio::sync::oneshot;

use super::analyser::{AnalyserNode, AudioContext, ContextState};
use super::blob::{Blob, ResultArtifact};
use super::capability::{MediaRecorder, MediaStream, Platform, RecorderEvent, RecorderState};
use super::error::CaptureError;
use super::options::{MediaConstraints, RecordingOptions, SoundOptions};

/// Audio covered by each data-available notification.
pub const TIMESLICE: Duration = Duration::from_millis(10);

/// Upper bound on waiting for a stopped recorder's final notification.
const FINALIZE_TIMEOUT: Duration = Duration::from_secs(5);

pub type StartCallback = Box<dyn FnMut() + Send>;
pub type DataCallback = Box<dyn FnMut(&Blob) + Send>;
pub type ArtifactCallback = Box<dyn FnMut(ResultArtifact) + Send>;

/// Observers of a recorder's lifecycle. All optional.
#[derive(Default)]
pub struct RecorderCallbacks {
    pub on_start: Option<StartCallback>,
    pub on_data: Option<DataCallback>,
    pub on_stop: Option<ArtifactCallback>,
    pub on_save: Option<ArtifactCallback>,
}

impl RecorderCallbacks {
    pub fn on_start(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn on_data(mut self, f: impl FnMut(&Blob) + Send + 'static) -> Self {
        self.on_data = Some(Box::new(f));
        self
    }

    pub fn on_stop(mut self, f: impl FnMut(ResultArtifact) + Send + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }

    pub fn on_save(mut self, f: impl FnMut(ResultArtifact) + Send + 'static) -> Self {
        self.on_save = Some(Box::new(f));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session began.
    Started,
    /// A paused session continued.
    Resumed,
    /// A session was already recording; nothing changed.
    AlreadyRecording,
}

/// Resolves with the artifact of a stopped session once it is finalized.
pub struct SessionCompletion {
    rx: oneshot::Receiver<ResultArtifact>,
}

impl SessionCompletion {
    /// Waits for the artifact. `None` if the controller was dropped first.
    pub async fn artifact(self) -> Option<ResultArtifact> {
        self.rx.await.ok()
    }

    /// Returns the artifact if it is already available.
    pub fn try_artifact(&mut self) -> Option<ResultArtifact> {
        self.rx.try_recv().ok()
    }
}

struct CaptureSession {
    start_time: i64,
    options: RecordingOptions,
    stream: Box<dyn MediaStream>,
    recorder: Arc<dyn MediaRecorder>,
    events: UnboundedReceiver<RecorderEvent>,
    chunks: Vec<Blob>,
    completion: Option<oneshot::Sender<ResultArtifact>>,
}

/// Starts, pauses and stops microphone recording sessions.
pub struct MicrophoneRecorder {
    platform: Platform,
    options: RecordingOptions,
    sound: SoundOptions,
    callbacks: RecorderCallbacks,
    audio_context: AudioContext,
    active: Option<CaptureSession>,
    finalizing: Vec<CaptureSession>,
}

impl MicrophoneRecorder {
    pub fn new(
        platform: Platform,
        options: RecordingOptions,
        sound: SoundOptions,
        callbacks: RecorderCallbacks,
    ) -> Self {
        Self {
            platform,
            options,
            sound,
            callbacks,
            audio_context: AudioContext::new(),
            active: None,
            finalizing: Vec::new(),
        }
    }

    pub fn options(&self) -> &RecordingOptions {
        &self.options
    }

    pub fn sound_options(&self) -> SoundOptions {
        self.sound
    }

    pub fn is_supported(&self) -> bool {
        self.platform.capture.is_supported()
    }

    pub fn has_session(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder_state() == Some(RecorderState::Recording)
    }

    pub fn is_paused(&self) -> bool {
        self.recorder_state() == Some(RecorderState::Paused)
    }

    fn recorder_state(&self) -> Option<RecorderState> {
        self.active.as_ref().map(|session| session.recorder.state())
    }

    /// Options of the active session, reflecting any format fallback.
    pub fn session_options(&self) -> Option<&RecordingOptions> {
        self.active.as_ref().map(|session| &session.options)
    }

    /// Analyser fed by the active session.
    pub fn analyser(&self) -> Option<Arc<AnalyserNode>> {
        self.active.as_ref()?;
        self.audio_context.current_analyser()
    }

    /// Chunks collected so far by the active session.
    pub fn chunk_count(&self) -> usize {
        self.active.as_ref().map_or(0, |session| session.chunks.len())
    }

    /// Starts a session, or resumes a paused one.
    pub async fn start(&mut self) -> Result<StartOutcome, CaptureError> {
        if let Some(outcome) = self.resume_active() {
            return Ok(outcome);
        }

        match self.acquire().await {
            Ok(stream) => self.begin(stream),
            Err(e) => {
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Continues the active session if there is one.
    pub fn resume_active(&mut self) -> Option<StartOutcome> {
        let session = self.active.as_ref()?;

        if self.audio_context.state() == ContextState::Suspended {
            self.audio_context.resume();
        }

        let outcome = match session.recorder.state() {
            RecorderState::Paused => {
                session.recorder.resume();
                tracing::info!("Recording resumed");
                StartOutcome::Resumed
            }
            RecorderState::Recording => StartOutcome::AlreadyRecording,
            RecorderState::Inactive => {
                if let Err(e) = session.recorder.start(TIMESLICE) {
                    tracing::error!("Failed to restart recorder: {}", e);
                    return Some(StartOutcome::AlreadyRecording);
                }
                let analyser = self.audio_context.analyser();
                if let Some(session) = self.active.as_mut() {
                    session.stream.connect(analyser);
                }
                if let Some(on_start) = self.callbacks.on_start.as_mut() {
                    on_start();
                }
                StartOutcome::Started
            }
        };
        Some(outcome)
    }

    /// Requests a stream with the configured sound options.
    ///
    /// The returned future owns everything it needs, so hosts can drive it
    /// on a separate task while they keep servicing frames.
    pub fn acquire(
        &self,
    ) -> impl Future<Output = Result<Box<dyn MediaStream>, CaptureError>> + Send + 'static {
        let capture = Arc::clone(&self.platform.capture);
        let constraints = MediaConstraints::from(self.sound);
        async move {
            if !capture.is_supported() {
                return Err(CaptureError::EnvironmentUnsupported);
            }
            tracing::debug!("Requesting input stream: {:?}", constraints);
            capture.request_stream(constraints).await
        }
    }

    /// Starts a session on a freshly acquired stream.
    pub fn begin(&mut self, mut stream: Box<dyn MediaStream>) -> Result<StartOutcome, CaptureError> {
        if self.active.is_some() {
            tracing::warn!("Session already active; releasing the extra stream");
            stream.stop_tracks();
            return Ok(StartOutcome::AlreadyRecording);
        }

        let options = self.effective_options();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let recorder = match self
            .platform
            .recorders
            .create(stream.as_mut(), &options, events_tx)
            .and_then(|recorder| recorder.start(TIMESLICE).map(|_| recorder))
        {
            Ok(recorder) => recorder,
            Err(e) => {
                stream.stop_tracks();
                self.report_failure(&e);
                return Err(e);
            }
        };

        self.audio_context.resume();
        stream.connect(self.audio_context.analyser());

        let format = stream.format();
        tracing::info!(
            "Recording started: {} at {}Hz, {} channels",
            options.mime_type,
            format.sample_rate,
            format.channels
        );

        self.active = Some(CaptureSession {
            start_time: now_ms(),
            options,
            stream,
            recorder,
            events: events_rx,
            chunks: Vec::new(),
            completion: None,
        });

        if let Some(on_start) = self.callbacks.on_start.as_mut() {
            on_start();
        }
        Ok(StartOutcome::Started)
    }

    /// Requested options, with the container swapped for the platform
    /// default when the requested one is unsupported.
    fn effective_options(&self) -> RecordingOptions {
        let recorders = &self.platform.recorders;
        if recorders.is_type_supported(&self.options.mime_type) {
            return self.options.clone();
        }

        let fallback = recorders.default_mime_type().to_string();
        tracing::info!(
            "{}; recording as {}",
            CaptureError::UnsupportedFormat(self.options.mime_type.clone()),
            fallback
        );
        self.options.with_mime_type(fallback)
    }

    /// Logs a failure and shows acquisition problems to the user.
    pub fn report_failure(&self, error: &CaptureError) {
        tracing::error!("Recording could not start: {}", error);
        if matches!(
            error,
            CaptureError::Acquisition(_) | CaptureError::EnvironmentUnsupported
        ) {
            self.platform.notifier.alert(&error.to_string());
        }
    }

    /// Pauses the active session.
    pub fn pause(&mut self) {
        if let Some(session) = self.active.as_ref() {
            session.recorder.pause();
            self.audio_context.suspend();
            tracing::info!("Recording paused");
        }
    }

    /// Stops the active session and releases its stream.
    ///
    /// Callbacks fire once the recorder's remaining notifications have been
    /// pumped. Returns `None` when nothing was recording.
    pub fn stop(&mut self) -> Option<SessionCompletion> {
        let mut session = self.active.take()?;

        if session.recorder.state() != RecorderState::Inactive {
            session.recorder.stop();
        }
        session.stream.stop_tracks();
        self.audio_context.reset_analyser();

        let (tx, rx) = oneshot::channel();
        session.completion = Some(tx);
        self.finalizing.push(session);

        tracing::debug!("Recording stopping");
        Some(SessionCompletion { rx })
    }

    /// Stops the active session and waits for its artifact.
    pub async fn stop_and_wait(&mut self) -> Option<ResultArtifact> {
        let completion = self.stop()?;
        let mut session = self.finalizing.pop()?;

        let drained = tokio::time::timeout(FINALIZE_TIMEOUT, async {
            while let Some(event) = session.events.recv().await {
                if handle_event(&mut session, &mut self.callbacks, event) {
                    break;
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!("Recorder did not confirm stop; finalizing with collected data");
        }

        self.finalize(session);
        completion.artifact().await
    }

    /// Delivers pending recorder notifications as callbacks.
    ///
    /// Returns the number of notifications handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;

        if let Some(session) = self.active.as_mut() {
            let (count, stopped) = drain_events(session, &mut self.callbacks);
            handled += count;
            if stopped {
                tracing::warn!("Recorder stopped on its own; closing session");
                if let Some(mut session) = self.active.take() {
                    session.stream.stop_tracks();
                    self.audio_context.reset_analyser();
                    self.finalize(session);
                }
            }
        }

        let mut index = 0;
        while index < self.finalizing.len() {
            let (count, stopped) = drain_events(&mut self.finalizing[index], &mut self.callbacks);
            handled += count;
            if stopped {
                let session = self.finalizing.remove(index);
                self.finalize(session);
            } else {
                index += 1;
            }
        }

        handled
    }

    /// Builds the artifact and fires stop, then save.
    fn finalize(&mut self, mut session: CaptureSession) {
        let blob = Blob::from_chunks(&session.chunks, session.recorder.mime_type());
        session.chunks.clear();

        let blob_url = match self.platform.blobs.create_object_url(&blob) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Failed to store recording: {}", e);
                self.platform.notifier.alert(&e.to_string());
                String::new()
            }
        };

        let artifact = ResultArtifact {
            blob,
            start_time: session.start_time,
            stop_time: now_ms().max(session.start_time),
            options: session.options.clone(),
            blob_url,
        };

        tracing::info!(
            "Recording finished: {} bytes of {} over {}ms",
            artifact.blob.len(),
            artifact.blob.mime_type(),
            artifact.duration_ms()
        );

        if let Some(on_stop) = self.callbacks.on_stop.as_mut() {
            on_stop(artifact.clone());
        }
        if let Some(on_save) = self.callbacks.on_save.as_mut() {
            on_save(artifact.clone());
        }
        if let Some(completion) = session.completion.take() {
            let _ = completion.send(artifact);
        }
    }
}

/// Drains queued notifications. Returns how many were handled and whether
/// the recorder has finished.
fn drain_events(session: &mut CaptureSession, callbacks: &mut RecorderCallbacks) -> (usize, bool) {
    let mut handled = 0;
    loop {
        match session.events.try_recv() {
            Ok(event) => {
                handled += 1;
                if handle_event(session, callbacks, event) {
                    return (handled, true);
                }
            }
            Err(TryRecvError::Empty) => return (handled, false),
            Err(TryRecvError::Disconnected) => return (handled, true),
        }
    }
}

/// Applies one notification. Returns true on `Stop`.
fn handle_event(
    session: &mut CaptureSession,
    callbacks: &mut RecorderCallbacks,
    event: RecorderEvent,
) -> bool {
    match event {
        RecorderEvent::DataAvailable(chunk) => {
            if let Some(on_data) = callbacks.on_data.as_mut() {
                on_data(&chunk);
            }
            session.chunks.push(chunk);
            false
        }
        RecorderEvent::Error(message) => {
            tracing::error!("Recorder error: {}", message);
            false
        }
        RecorderEvent::Stop => true,
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
