//! Recording history.
//!
//! Stores metadata about saved recordings as one JSON file each so they can
//! be listed later. Only the newest `limit` recordings are kept.

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::blob::ArtifactSummary;

/// Metadata about a saved recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Unique identifier for this recording
    pub id: String,
    #[serde(flatten)]
    pub artifact: ArtifactSummary,
    /// When the metadata was written
    pub created_at: DateTime<Local>,
}

impl RecordingMetadata {
    /// Local file behind the blob URL, if it is a `file://` URL.
    pub fn audio_path(&self) -> Option<PathBuf> {
        self.artifact
            .blob_url
            .strip_prefix("file://")
            .map(PathBuf::from)
    }
}

pub struct RecordingHistory {
    history_dir: PathBuf,
    limit: usize,
}

impl RecordingHistory {
    pub fn new(data_dir: &Path, limit: usize) -> Result<Self> {
        let history_dir = data_dir.join("recording_history");
        fs::create_dir_all(&history_dir)?;
        Ok(Self {
            history_dir,
            limit: limit.max(1),
        })
    }

    /// Saves metadata for a finished recording and prunes old entries.
    pub fn save_recording(&self, artifact: ArtifactSummary) -> Result<String> {
        let now = Local::now();
        let id = format!("{}-{}", now.timestamp_millis(), &uuid::Uuid::new_v4().simple().to_string()[..8]);
        let metadata = RecordingMetadata {
            id: id.clone(),
            artifact,
            created_at: now,
        };

        let json = serde_json::to_string_pretty(&metadata)?;
        fs::write(self.history_dir.join(format!("{id}.json")), json)?;
        tracing::info!("Recording metadata saved with ID: {}", id);

        self.prune()?;
        Ok(id)
    }

    /// Every readable entry, newest first.
    pub fn get_all_recordings(&self) -> Result<Vec<RecordingMetadata>> {
        Ok(self
            .load_entries()?
            .into_iter()
            .map(|(_, metadata)| metadata)
            .collect())
    }

    pub fn get_recording(&self, id: &str) -> Result<Option<RecordingMetadata>> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Ok(None);
        }
        let path = self.history_dir.join(format!("{id}.json"));
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn load_entries(&self) -> Result<Vec<(PathBuf, RecordingMetadata)>> {
        let mut entries: Vec<(PathBuf, RecordingMetadata)> = fs::read_dir(&self.history_dir)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    let content = fs::read_to_string(&path).ok()?;
                    let metadata = serde_json::from_str(&content).ok()?;
                    Some((path, metadata))
                } else {
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.1.id.cmp(&a.1.id))
        });
        Ok(entries)
    }

    /// Deletes entries (and their audio files) beyond the limit.
    fn prune(&self) -> Result<()> {
        for (path, metadata) in self.load_entries()?.into_iter().skip(self.limit) {
            if let Some(audio_path) = metadata.audio_path().filter(|p| p.exists()) {
                match fs::remove_file(&audio_path) {
                    Ok(()) => tracing::info!("Deleted old recording audio: {}", audio_path.display()),
                    Err(e) => tracing::warn!("Failed to delete old recording audio: {}", e),
                }
            }
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to delete old recording metadata: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(url: &str, start_time: i64) -> ArtifactSummary {
        ArtifactSummary {
            blob_url: url.to_string(),
            mime_type: "audio/wav".to_string(),
            size_bytes: 44,
            start_time,
            stop_time: start_time + 1_000,
            audio_bits_per_second: 128_000,
        }
    }

    #[test]
    fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let history = RecordingHistory::new(dir.path(), 10).unwrap();

        let id = history.save_recording(summary("blob:micwave/a", 5)).unwrap();
        let loaded = history.get_recording(&id).unwrap().unwrap();
        assert_eq!(loaded.artifact, summary("blob:micwave/a", 5));
        assert_eq!(loaded.audio_path(), None);
        assert!(history.get_recording("missing").unwrap().is_none());
        assert!(history.get_recording("../history/missing").unwrap().is_none());
    }

    #[test]
    fn test_keeps_newest_entries_and_removes_audio() {
        let dir = tempfile::tempdir().unwrap();
        let history = RecordingHistory::new(dir.path(), 2).unwrap();

        let oldest_audio = dir.path().join("oldest.wav");
        fs::write(&oldest_audio, b"RIFF").unwrap();
        history
            .save_recording(summary(&format!("file://{}", oldest_audio.display()), 1))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        history.save_recording(summary("blob:micwave/b", 2)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        history.save_recording(summary("blob:micwave/c", 3)).unwrap();

        let all = history.get_all_recordings().unwrap();
        let starts: Vec<i64> = all.iter().map(|m| m.artifact.start_time).collect();
        assert_eq!(starts, vec![3, 2]);
        assert!(!oldest_audio.exists());
    }
}
