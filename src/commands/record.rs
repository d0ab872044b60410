//! Interactive recording.
//!
//! Runs the widget inside the terminal host: the record flag follows the
//! `r` key, frames are drawn at roughly 60 fps and every saved recording is
//! added to the history.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{self, MicwaveConfig};
use crate::recording::{
    native_platform, ArtifactSummary, MicWidget, MicwaveTui, RecorderCallbacks, RecordingCommand,
    RecordingHistory, VisualSetting, WidgetState,
};
use crate::recording::ui::FooterStatus;
use crate::ui::{ErrorScreen, NoticeBoard};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Command-line overrides for the `[widget]`, `[audio]` and `[output]` settings.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RecordArgs {
    /// Visualization: sinewave, frequencyBars or frequencyCircles
    #[arg(short, long, value_name = "STYLE")]
    pub style: Option<String>,

    /// Drawing surface width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Drawing surface height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Background color (CSS syntax)
    #[arg(long, value_name = "COLOR")]
    pub background: Option<String>,

    /// Stroke color (CSS syntax)
    #[arg(long, value_name = "COLOR")]
    pub stroke: Option<String>,

    /// Requested container, e.g. audio/wav
    #[arg(long, value_name = "MIME")]
    pub mime_type: Option<String>,

    /// Requested bitrate in bits per second
    #[arg(long, value_name = "BPS")]
    pub bitrate: Option<u32>,

    /// Number of input channels to request
    #[arg(long)]
    pub channels: Option<u16>,

    /// Request echo cancellation
    #[arg(long)]
    pub echo_cancellation: bool,

    /// Request automatic gain control
    #[arg(long)]
    pub auto_gain_control: bool,

    /// Request noise suppression
    #[arg(long)]
    pub noise_suppression: bool,

    /// Input device: "default", an index or a name from `micwave list-devices`
    #[arg(short, long)]
    pub device: Option<String>,

    /// Directory for recorded files
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Stop and exit after this many seconds of recording
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

impl RecordArgs {
    /// Layers the flags over the loaded configuration.
    pub fn apply_to(&self, config: &mut MicwaveConfig) {
        let widget = &mut config.widget;
        if let Some(style) = &self.style {
            widget.visual_setting = VisualSetting::from(style.as_str());
        }
        if let Some(width) = self.width {
            widget.width = width;
        }
        if let Some(height) = self.height {
            widget.height = height;
        }
        if let Some(background) = &self.background {
            widget.background_color = background.clone();
        }
        if let Some(stroke) = &self.stroke {
            widget.stroke_color = stroke.clone();
        }
        if let Some(mime_type) = &self.mime_type {
            widget.mime_type = mime_type.clone();
        }
        if let Some(bitrate) = self.bitrate {
            widget.audio_bits_per_second = bitrate;
        }
        if let Some(channels) = self.channels {
            widget.channel_count = channels;
        }
        widget.echo_cancellation |= self.echo_cancellation;
        widget.auto_gain_control |= self.auto_gain_control;
        widget.noise_suppression |= self.noise_suppression;

        if let Some(device) = &self.device {
            config.audio.device = device.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.recordings_dir = Some(dir.clone());
        }
    }
}

/// Per-session counters fed by the widget callbacks.
#[derive(Debug, Default)]
struct SessionStats {
    chunks: usize,
    bytes: usize,
    saved: Vec<ArtifactSummary>,
}

/// Recording time, excluding pauses.
#[derive(Debug, Default)]
struct Stopwatch {
    started: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
    last_state: Option<WidgetState>,
}

impl Stopwatch {
    fn update(&mut self, state: WidgetState, now: Instant) {
        if self.last_state == Some(state) {
            return;
        }
        match state {
            WidgetState::Recording if self.last_state == Some(WidgetState::Paused) => {
                if let Some(paused_at) = self.paused_at.take() {
                    self.paused_total += now - paused_at;
                }
            }
            WidgetState::Recording => {
                self.started = Some(now);
                self.paused_at = None;
                self.paused_total = Duration::ZERO;
            }
            WidgetState::Paused => self.paused_at = Some(now),
            WidgetState::Idle | WidgetState::Acquiring => {}
        }
        self.last_state = Some(state);
    }

    fn elapsed(&self, now: Instant) -> Duration {
        let Some(started) = self.started else {
            return Duration::ZERO;
        };
        let paused = self.paused_total + self.paused_at.map_or(Duration::ZERO, |p| now - p);
        (now - started).saturating_sub(paused)
    }
}

/// Records from the microphone with a live visualization.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the terminal cannot be initialized or drawn
pub async fn handle_record(args: RecordArgs) -> anyhow::Result<()> {
    tracing::info!("=== micwave recorder started ===");

    let mut config_data = match MicwaveConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err:#}");
            let error_message = format!(
                "Configuration Error:\n\n{err:#}\n\nPlease check your ~/.config/micwave/micwave.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(err);
        }
    };
    args.apply_to(&mut config_data);

    let recordings_dir = config_data.recordings_dir()?;
    let history = RecordingHistory::new(&config::get_data_dir()?, config_data.output.history_limit)?;
    tracing::info!(
        "Configuration: device={}, style={}, mime={}, recordings={}",
        config_data.audio.device,
        config_data.widget.visual_setting,
        config_data.widget.mime_type,
        recordings_dir.display()
    );

    let notices = Arc::new(NoticeBoard::new());
    let platform = native_platform(&config_data.audio.device, recordings_dir, notices.clone());

    let stats = Arc::new(Mutex::new(SessionStats::default()));
    let callbacks = session_callbacks(&stats, history);

    let setting = config_data.widget.visual_setting.to_string();
    let mut widget = MicWidget::new(config_data.widget.clone(), platform, callbacks);
    let mut tui = MicwaveTui::new().map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;
    let mut stopwatch = Stopwatch::default();
    let limit = args.duration.map(Duration::from_secs);

    widget.set_record(true);

    loop {
        if let Some(notice) = notices.next_notice() {
            tui.show_notice(&notice)
                .map_err(|e| anyhow::anyhow!("Render failed: {e}"))?;
        }

        match tui.handle_input(Duration::ZERO) {
            Ok(RecordingCommand::Continue) => {}
            Ok(RecordingCommand::ToggleRecord) => {
                let record = !widget.record();
                tracing::debug!("Record toggled to {}", record);
                widget.set_record(record);
            }
            Ok(RecordingCommand::TogglePause) => {
                let paused = widget.state() == WidgetState::Paused;
                widget.set_paused(!paused);
            }
            Ok(RecordingCommand::Quit) => break,
            Err(e) => {
                tracing::error!("Input handling error: {}", e);
                return Err(anyhow::anyhow!("Input handling error: {e}"));
            }
        }

        widget.tick();

        let now = Instant::now();
        stopwatch.update(widget.state(), now);
        let elapsed = stopwatch.elapsed(now);
        if limit.is_some_and(|limit| elapsed >= limit) {
            tracing::info!("Duration limit reached after {:.1}s", elapsed.as_secs_f32());
            break;
        }

        let footer = {
            let stats = stats.lock();
            FooterStatus {
                state: widget.state(),
                elapsed,
                chunks: stats.chunks,
                bytes: stats.bytes,
                setting: setting.clone(),
            }
        };
        tui.render(widget.surface(), &footer)
            .map_err(|e| anyhow::anyhow!("Render failed: {e}"))?;

        tokio::time::sleep(FRAME_INTERVAL).await;
    }

    widget.teardown();
    drop(widget);

    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    for saved in &stats.lock().saved {
        println!("{}", saved.blob_url);
    }

    tracing::info!("=== micwave recorder exited successfully ===");
    Ok(())
}

fn session_callbacks(stats: &Arc<Mutex<SessionStats>>, history: RecordingHistory) -> RecorderCallbacks {
    let on_start = Arc::clone(stats);
    let on_data = Arc::clone(stats);
    let on_save = Arc::clone(stats);

    RecorderCallbacks::default()
        .on_start(move || {
            let mut stats = on_start.lock();
            stats.chunks = 0;
            stats.bytes = 0;
        })
        .on_data(move |chunk| {
            let mut stats = on_data.lock();
            stats.chunks += 1;
            stats.bytes += chunk.len();
        })
        .on_stop(|artifact| {
            tracing::info!(
                "Recording stopped: {}ms, {} bytes",
                artifact.duration_ms(),
                artifact.blob.len()
            );
        })
        .on_save(move |artifact| {
            let summary = artifact.summary();
            if let Err(e) = history.save_recording(summary.clone()) {
                tracing::warn!("Failed to save recording to history: {}", e);
            }
            on_save.lock().saved.push(summary);
        })
}
