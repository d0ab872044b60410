//! Visualization modules for recording display.
//!
//! Each module draws one style from live analyser data onto a [`Surface`].
//! [`VisualizationDriver`] picks the style from the configured setting and
//! redraws the whole surface every frame.

pub mod frequency_bars;
pub mod frequency_circles;
pub mod sinewave;

use serde::{Deserialize, Serialize};
use std::fmt;

use super::analyser::AnalyserNode;
use super::surface::{Rgba, Surface};

/// Visualization style selected by name.
///
/// Unknown names are kept as-is and draw nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VisualSetting {
    /// Time-domain waveform as one connected stroke
    #[default]
    SineWave,
    /// Frequency spectrum as vertical bars
    FrequencyBars,
    /// Frequency magnitudes as concentric circles
    FrequencyCircles,
    Unknown(String),
}

impl VisualSetting {
    /// Analyser window the style reads, if it draws at all.
    pub fn fft_size(&self) -> Option<usize> {
        match self {
            Self::SineWave => Some(sinewave::FFT_SIZE),
            Self::FrequencyBars => Some(frequency_bars::FFT_SIZE),
            Self::FrequencyCircles => Some(frequency_circles::FFT_SIZE),
            Self::Unknown(_) => None,
        }
    }
}

impl From<&str> for VisualSetting {
    fn from(value: &str) -> Self {
        match value {
            "sinewave" => Self::SineWave,
            "frequencyBars" => Self::FrequencyBars,
            "frequencyCircles" => Self::FrequencyCircles,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for VisualSetting {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<VisualSetting> for String {
    fn from(value: VisualSetting) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VisualSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SineWave => write!(f, "sinewave"),
            Self::FrequencyBars => write!(f, "frequencyBars"),
            Self::FrequencyCircles => write!(f, "frequencyCircles"),
            Self::Unknown(name) => write!(f, "{name}"),
        }
    }
}

/// Draws the configured style once per animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationDriver {
    setting: VisualSetting,
    background: Rgba,
    stroke: Rgba,
}

impl VisualizationDriver {
    pub fn new(setting: VisualSetting, background: Rgba, stroke: Rgba) -> Self {
        Self {
            setting,
            background,
            stroke,
        }
    }

    pub fn setting(&self) -> &VisualSetting {
        &self.setting
    }

    /// Configures the analyser window for this style.
    pub fn prepare(&self, analyser: &AnalyserNode) {
        if let Some(size) = self.setting.fft_size() {
            if let Err(e) = analyser.set_fft_size(size) {
                tracing::error!("Analyser rejected window for {}: {}", self.setting, e);
            }
        }
    }

    /// Redraws one frame. Returns false when the style draws nothing.
    pub fn draw_frame<S: Surface + ?Sized>(&self, surface: &mut S, analyser: &AnalyserNode) -> bool {
        match &self.setting {
            VisualSetting::SineWave => {
                sinewave::draw(surface, analyser, self.background, self.stroke)
            }
            VisualSetting::FrequencyBars => {
                frequency_bars::draw(surface, analyser, self.background, self.stroke)
            }
            VisualSetting::FrequencyCircles => {
                frequency_circles::draw(surface, analyser, self.background, self.stroke)
            }
            VisualSetting::Unknown(_) => return false,
        }
        true
    }
}
