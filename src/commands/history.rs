//! Recording history listing.

use anyhow::Context;
use chrono::{Local, TimeZone};

use crate::config::{self, MicwaveConfig};
use crate::recording::{RecordingHistory, RecordingMetadata};

/// Prints saved recordings, most recent first, or the one named by `id`.
///
/// # Errors
/// - If the data directory cannot be determined
/// - If the history directory cannot be read
/// - If `id` names no saved recording
pub fn handle_history(id: Option<&str>) -> Result<(), anyhow::Error> {
    tracing::info!("=== micwave history ===");

    let limit = MicwaveConfig::load()
        .map(|c| c.output.history_limit)
        .unwrap_or_else(|e| {
            tracing::warn!("Using default history limit: {e:#}");
            MicwaveConfig::default().output.history_limit
        });
    let history = RecordingHistory::new(&config::get_data_dir()?, limit)?;

    if let Some(id) = id {
        let entry = history
            .get_recording(id)?
            .with_context(|| format!("No recording with id '{id}'"))?;
        println!("{}", format_entry(1, &entry));
        if let Some(path) = entry.audio_path() {
            let status = if path.exists() { "present" } else { "missing" };
            println!("     file {status}: {}", path.display());
        }
        return Ok(());
    }

    let entries = history.get_all_recordings()?;

    if entries.is_empty() {
        println!("No recordings found.");
        return Ok(());
    }

    for (index, entry) in entries.iter().enumerate() {
        println!("{}", format_entry(index + 1, entry));
    }
    Ok(())
}

fn format_entry(index: usize, entry: &RecordingMetadata) -> String {
    let artifact = &entry.artifact;
    let started = Local
        .timestamp_millis_opt(artifact.start_time)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown time".to_string());
    let seconds = (artifact.stop_time - artifact.start_time).max(0) as f64 / 1000.0;

    format!(
        "{index:>3}. {started}  {seconds:>6.1}s  {:>9} bytes  {}  [{}]\n     {}",
        artifact.size_bytes, artifact.mime_type, entry.id, artifact.blob_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::ArtifactSummary;

    #[test]
    fn test_format_entry() {
        let entry = RecordingMetadata {
            id: "1".to_string(),
            artifact: ArtifactSummary {
                blob_url: "file:///tmp/micwave-1.wav".to_string(),
                mime_type: "audio/wav".to_string(),
                size_bytes: 96_044,
                start_time: 1_700_000_000_000,
                stop_time: 1_700_000_001_500,
                audio_bits_per_second: 128_000,
            },
            created_at: Local::now(),
        };

        let line = format_entry(1, &entry);
        assert!(line.starts_with("  1. "));
        assert!(line.contains("   1.5s"));
        assert!(line.contains("96044 bytes"));
        assert!(line.contains("audio/wav  [1]"));
        assert!(line.ends_with("file:///tmp/micwave-1.wav"));
    }
}
