//! Configuration file management for micwave.
//!
//! Loads and saves `~/.config/micwave/micwave.toml`. Every field has a
//! default, so a missing file or a partial one is fine.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::recording::WidgetProps;

/// Input device selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `micwave list-devices`
    /// - device name from `micwave list-devices`
    pub device: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
        }
    }
}

/// Where finished recordings go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for recorded files. Defaults to `~/.local/share/micwave/recordings`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recordings_dir: Option<PathBuf>,
    /// Number of recordings kept in history
    pub history_limit: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            recordings_dir: None,
            history_limit: 10,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicwaveConfig {
    pub audio: AudioConfig,
    pub widget: WidgetProps,
    pub output: OutputConfig,
}

impl MicwaveConfig {
    /// Loads configuration from the user's config directory, falling back
    /// to defaults when the file does not exist.
    ///
    /// # Errors
    /// - If the home directory cannot be determined
    /// - If the file exists but cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: MicwaveConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Directory recordings are written to.
    pub fn recordings_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.output.recordings_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_data_dir()?.join("recordings")),
        }
    }
}

/// Path of the config file. Does not create anything.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("micwave").join("micwave.toml"))
}

/// Application data directory (`~/.local/share/micwave`).
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("share").join("micwave"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::VisualSetting;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MicwaveConfig::load_from(&dir.path().join("micwave.toml")).unwrap();
        assert_eq!(config, MicwaveConfig::default());
        assert_eq!(config.widget.width, 640);
        assert_eq!(config.output.history_limit, 10);
        assert_eq!(config.audio.device, "default");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("micwave.toml");
        fs::write(
            &path,
            "[widget]\nvisual_setting = \"frequencyCircles\"\nstroke_color = \"#ff0000\"\n\n[output]\nhistory_limit = 3\n",
        )
        .unwrap();

        let config = MicwaveConfig::load_from(&path).unwrap();
        assert_eq!(config.widget.visual_setting, VisualSetting::FrequencyCircles);
        assert_eq!(config.widget.stroke_color, "#ff0000");
        assert_eq!(config.widget.background_color, "rgba(255, 255, 255, 0.5)");
        assert_eq!(config.output.history_limit, 3);
        assert_eq!(config.output.recordings_dir, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("micwave.toml");
        let mut config = MicwaveConfig::default();
        config.widget.height = 200;
        config.output.recordings_dir = Some(dir.path().join("out"));

        config.save_to(&path).unwrap();
        assert_eq!(MicwaveConfig::load_from(&path).unwrap(), config);
        assert_eq!(config.recordings_dir().unwrap(), dir.path().join("out"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("micwave.toml");
        fs::write(&path, "[widget\nwidth = ").unwrap();
        assert!(MicwaveConfig::load_from(&path).is_err());
    }
}
