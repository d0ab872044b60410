//! Record-flag driven microphone widget.
//!
//! A host flips [`MicWidget::set_record`] and calls [`MicWidget::tick`] once
//! per animation frame. Acquisition runs on a spawned task; the widget polls
//! it from `tick`, so the host never blocks on the permission prompt.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot::{self, error::TryRecvError};

use super::analyser::AnalyserNode;
use super::capability::{MediaStream, Platform};
use super::controller::{MicrophoneRecorder, RecorderCallbacks};
use super::error::CaptureError;
use super::options::{
    RecordingOptions, SoundOptions, DEFAULT_BITS_PER_SECOND, DEFAULT_CHANNEL_COUNT,
    DEFAULT_MIME_TYPE,
};
use super::surface::{DisplayList, Rgba, Surface};
use super::visualizations::{VisualSetting, VisualizationDriver};

pub const DEFAULT_BACKGROUND_COLOR: &str = "rgba(255, 255, 255, 0.5)";
pub const DEFAULT_STROKE_COLOR: &str = "#000000";
pub const DEFAULT_CLASS_NAME: &str = "visualizer";
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 100;

/// Widget configuration. Every field defaults independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetProps {
    pub background_color: String,
    pub stroke_color: String,
    pub class_name: String,
    pub audio_bits_per_second: u32,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub visual_setting: VisualSetting,
    pub echo_cancellation: bool,
    pub auto_gain_control: bool,
    pub noise_suppression: bool,
    pub channel_count: u16,
}

impl Default for WidgetProps {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            stroke_color: DEFAULT_STROKE_COLOR.to_string(),
            class_name: DEFAULT_CLASS_NAME.to_string(),
            audio_bits_per_second: DEFAULT_BITS_PER_SECOND,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            visual_setting: VisualSetting::default(),
            echo_cancellation: false,
            auto_gain_control: false,
            noise_suppression: false,
            channel_count: DEFAULT_CHANNEL_COUNT,
        }
    }
}

impl WidgetProps {
    pub fn recording_options(&self) -> RecordingOptions {
        RecordingOptions {
            audio_bits_per_second: self.audio_bits_per_second,
            mime_type: self.mime_type.clone(),
        }
    }

    pub fn sound_options(&self) -> SoundOptions {
        SoundOptions {
            echo_cancellation: self.echo_cancellation,
            auto_gain_control: self.auto_gain_control,
            noise_suppression: self.noise_suppression,
            channel_count: self.channel_count,
        }
    }

    pub fn background(&self) -> Rgba {
        parse_color_or(&self.background_color, DEFAULT_BACKGROUND_COLOR, "background")
    }

    pub fn stroke(&self) -> Rgba {
        parse_color_or(&self.stroke_color, DEFAULT_STROKE_COLOR, "stroke")
    }
}

fn parse_color_or(value: &str, default: &str, which: &str) -> Rgba {
    Rgba::parse(value).unwrap_or_else(|e| {
        tracing::warn!("{}; using default {} color {}", e, which, default);
        Rgba::parse(default).unwrap_or(Rgba::BLACK)
    })
}

type AcquisitionResult = Result<Box<dyn MediaStream>, CaptureError>;

struct PendingAcquisition {
    rx: oneshot::Receiver<AcquisitionResult>,
    cancelled: bool,
}

enum Phase {
    Idle,
    Acquiring(PendingAcquisition),
    Recording,
}

/// Coarse widget state for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Idle,
    Acquiring,
    Recording,
    Paused,
}

/// Microphone recorder with a live visualization surface.
pub struct MicWidget<S: Surface = DisplayList> {
    props: WidgetProps,
    recorder: MicrophoneRecorder,
    driver: VisualizationDriver,
    surface: S,
    phase: Phase,
    record: bool,
}

impl MicWidget<DisplayList> {
    pub fn new(props: WidgetProps, platform: Platform, callbacks: RecorderCallbacks) -> Self {
        let surface = DisplayList::new(props.width, props.height);
        Self::with_surface(props, platform, callbacks, surface)
    }
}

impl<S: Surface> MicWidget<S> {
    pub fn with_surface(
        props: WidgetProps,
        platform: Platform,
        callbacks: RecorderCallbacks,
        surface: S,
    ) -> Self {
        let recorder = MicrophoneRecorder::new(
            platform,
            props.recording_options(),
            props.sound_options(),
            callbacks,
        );
        let driver = VisualizationDriver::new(
            props.visual_setting.clone(),
            props.background(),
            props.stroke(),
        );
        if let VisualSetting::Unknown(name) = &props.visual_setting {
            tracing::warn!("Unknown visual setting '{}'; nothing will be drawn", name);
        }

        Self {
            props,
            recorder,
            driver,
            surface,
            phase: Phase::Idle,
            record: false,
        }
    }

    pub fn props(&self) -> &WidgetProps {
        &self.props
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn record(&self) -> bool {
        self.record
    }

    pub fn recorder(&self) -> &MicrophoneRecorder {
        &self.recorder
    }

    pub fn analyser(&self) -> Option<std::sync::Arc<AnalyserNode>> {
        self.recorder.analyser()
    }

    pub fn state(&self) -> WidgetState {
        match &self.phase {
            Phase::Idle => WidgetState::Idle,
            Phase::Acquiring(pending) if pending.cancelled => WidgetState::Idle,
            Phase::Acquiring(_) => WidgetState::Acquiring,
            Phase::Recording if self.recorder.is_paused() => WidgetState::Paused,
            Phase::Recording => WidgetState::Recording,
        }
    }

    /// Applies the record flag. Only transitions have an effect.
    pub fn set_record(&mut self, record: bool) {
        if record == self.record {
            return;
        }
        self.record = record;

        if let Phase::Acquiring(pending) = &mut self.phase {
            tracing::debug!(
                "Record set to {} while acquiring; pending request {}",
                record,
                if record { "kept" } else { "cancelled" }
            );
            pending.cancelled = !record;
            return;
        }

        let recording = matches!(self.phase, Phase::Recording);
        if record && !recording {
            self.spawn_acquisition();
        } else if !record && recording {
            self.end_session();
        }
    }

    /// Pauses or resumes an active session.
    pub fn set_paused(&mut self, paused: bool) {
        if !matches!(self.phase, Phase::Recording) {
            return;
        }
        if paused {
            self.recorder.pause();
        } else {
            self.recorder.resume_active();
        }
    }

    /// Per-frame work: finish acquisition, deliver callbacks, draw.
    ///
    /// Returns true when a frame was drawn.
    pub fn tick(&mut self) -> bool {
        self.poll_acquisition();
        self.recorder.pump_events();

        if matches!(self.phase, Phase::Recording) && !self.recorder.has_session() {
            tracing::debug!("Session ended by the recorder; widget back to idle");
            let bounds = self.surface.bounds();
            self.surface.clear_rect(bounds);
            self.phase = Phase::Idle;
            self.record = false;
        }

        if !matches!(self.phase, Phase::Recording) {
            return false;
        }
        match self.recorder.analyser() {
            Some(analyser) => self.driver.draw_frame(&mut self.surface, &analyser),
            None => false,
        }
    }

    /// Stops any session and releases pending acquisitions.
    pub fn teardown(&mut self) {
        self.set_record(false);
        self.recorder.pump_events();
    }

    fn spawn_acquisition(&mut self) {
        let acquire = self.recorder.acquire();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Err(Ok(mut stream)) = tx.send(acquire.await) {
                // Widget went away before the grant arrived.
                stream.stop_tracks();
            }
        });
        self.phase = Phase::Acquiring(PendingAcquisition {
            rx,
            cancelled: false,
        });
        tracing::debug!("Microphone acquisition started");
    }

    fn poll_acquisition(&mut self) {
        let Phase::Acquiring(pending) = &mut self.phase else {
            return;
        };

        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => Err(CaptureError::Acquisition(
                "acquisition task ended without a result".to_string(),
            )),
        };
        let cancelled = pending.cancelled;
        self.phase = Phase::Idle;

        match result {
            Ok(mut stream) if cancelled => {
                tracing::debug!("Releasing stream granted after cancellation");
                stream.stop_tracks();
            }
            Ok(stream) => match self.recorder.begin(stream) {
                Ok(_) => {
                    if let Some(analyser) = self.recorder.analyser() {
                        self.driver.prepare(&analyser);
                    }
                    let bounds = self.surface.bounds();
                    self.surface.clear_rect(bounds);
                    self.phase = Phase::Recording;
                }
                Err(_) => self.record = false,
            },
            Err(e) if cancelled => {
                tracing::debug!("Cancelled acquisition failed: {}", e);
            }
            Err(e) => {
                self.recorder.report_failure(&e);
                self.record = false;
            }
        }
    }

    fn end_session(&mut self) {
        self.recorder.stop();
        let bounds = self.surface.bounds();
        self.surface.clear_rect(bounds);
        self.phase = Phase::Idle;
    }
}

impl<S: Surface> Drop for MicWidget<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
