//! Recording and sound option snapshots.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIME_TYPE: &str = "audio/webm;codecs=opus";
pub const DEFAULT_BITS_PER_SECOND: u32 = 128_000;
pub const DEFAULT_CHANNEL_COUNT: u16 = 2;

/// Encoder configuration applied when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingOptions {
    /// Target bitrate; PCM containers ignore it.
    pub audio_bits_per_second: u32,
    /// Container mime type, e.g. `audio/wav`.
    pub mime_type: String,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            audio_bits_per_second: DEFAULT_BITS_PER_SECOND,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

impl RecordingOptions {
    /// Same options with a different container.
    pub fn with_mime_type(&self, mime_type: impl Into<String>) -> Self {
        Self {
            audio_bits_per_second: self.audio_bits_per_second,
            mime_type: mime_type.into(),
        }
    }
}

/// Input processing toggles handed to the capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundOptions {
    pub echo_cancellation: bool,
    pub auto_gain_control: bool,
    pub noise_suppression: bool,
    pub channel_count: u16,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self {
            echo_cancellation: false,
            auto_gain_control: false,
            noise_suppression: false,
            channel_count: DEFAULT_CHANNEL_COUNT,
        }
    }
}

/// Constraints sent with a capture request. Video is never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: SoundOptions,
}

impl From<SoundOptions> for MediaConstraints {
    fn from(audio: SoundOptions) -> Self {
        Self { audio }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_widget_defaults() {
        let options = RecordingOptions::default();
        assert_eq!(options.audio_bits_per_second, 128_000);
        assert_eq!(options.mime_type, "audio/webm;codecs=opus");

        let sound = SoundOptions::default();
        assert!(!sound.echo_cancellation);
        assert!(!sound.auto_gain_control);
        assert!(!sound.noise_suppression);
        assert_eq!(sound.channel_count, 2);
    }

    #[test]
    fn test_constraints_keep_channel_count() {
        let sound = SoundOptions {
            channel_count: 1,
            ..SoundOptions::default()
        };
        let constraints = MediaConstraints::from(sound);
        assert_eq!(constraints.audio.channel_count, 1);
    }

    #[test]
    fn test_with_mime_type_keeps_bitrate() {
        let options = RecordingOptions {
            audio_bits_per_second: 64_000,
            mime_type: "audio/ogg".to_string(),
        };
        let fallback = options.with_mime_type("audio/wav");
        assert_eq!(fallback.audio_bits_per_second, 64_000);
        assert_eq!(fallback.mime_type, "audio/wav");
    }
}
