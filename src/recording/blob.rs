//! Binary payloads, finished recordings and the stores that give them URLs.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::capability::BlobStore;
use super::encoder;
use super::error::CaptureError;
use super::options::RecordingOptions;

/// Immutable byte payload tagged with its mime type. Cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Joins recorder chunks into one payload.
    ///
    /// Streamed WAV chunks carry provisional header sizes, so the joined
    /// payload gets its RIFF and data sizes rewritten.
    pub fn from_chunks(chunks: &[Blob], mime_type: &str) -> Self {
        let total: usize = chunks.iter().map(Blob::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(chunk.bytes());
        }

        if encoder::is_wav_mime(mime_type) {
            encoder::repair_wav_header(&mut bytes);
        }

        Self::new(bytes, mime_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Output of one completed recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultArtifact {
    pub blob: Blob,
    /// Epoch milliseconds when the session started.
    pub start_time: i64,
    /// Epoch milliseconds when the session was finalized.
    pub stop_time: i64,
    /// Options the payload was actually produced with.
    pub options: RecordingOptions,
    pub blob_url: String,
}

impl ResultArtifact {
    pub fn duration_ms(&self) -> i64 {
        self.stop_time - self.start_time
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            blob_url: self.blob_url.clone(),
            mime_type: self.blob.mime_type().to_string(),
            size_bytes: self.blob.len(),
            start_time: self.start_time,
            stop_time: self.stop_time,
            audio_bits_per_second: self.options.audio_bits_per_second,
        }
    }
}

/// Serializable metadata of an artifact, without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub blob_url: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub start_time: i64,
    pub stop_time: i64,
    pub audio_bits_per_second: u32,
}

/// File extension for a mime type, ignoring codec parameters.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let base = mime_type.split(';').next().unwrap_or("").trim();
    match base {
        "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/flac" => "flac",
        _ => "bin",
    }
}

/// Writes payloads into a directory and returns `file://` URLs.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a URL this store created back to its file.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = PathBuf::from(url.strip_prefix("file://")?);
        let escapes = path.components().any(|c| c == Component::ParentDir);
        if !escapes && path.starts_with(&self.dir) && path.exists() {
            Some(path)
        } else {
            None
        }
    }
}

impl BlobStore for FileBlobStore {
    fn create_object_url(&self, blob: &Blob) -> Result<String, CaptureError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| CaptureError::Blob(format!("{}: {e}", self.dir.display())))?;

        let file_name = format!(
            "micwave-{}.{}",
            uuid::Uuid::new_v4(),
            extension_for_mime(blob.mime_type())
        );
        let path = self.dir.join(file_name);
        fs::write(&path, blob.bytes())
            .map_err(|e| CaptureError::Blob(format!("{}: {e}", path.display())))?;

        tracing::debug!("Blob written: {} ({} bytes)", path.display(), blob.len());
        Ok(format!("file://{}", path.display()))
    }

    fn revoke_object_url(&self, url: &str) {
        if let Some(path) = self.resolve(url) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Keeps payloads in memory behind `blob:` URLs.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.blobs.lock().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn create_object_url(&self, blob: &Blob) -> Result<String, CaptureError> {
        let url = format!("blob:micwave/{}", uuid::Uuid::new_v4());
        self.blobs.lock().insert(url.clone(), blob.clone());
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) {
        self.blobs.lock().remove(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chunks_concatenates_in_order() {
        let chunks = vec![
            Blob::new(vec![1u8, 2], "application/octet-stream"),
            Blob::new(vec![3u8], "application/octet-stream"),
            Blob::new(Vec::<u8>::new(), "application/octet-stream"),
            Blob::new(vec![4u8, 5], "application/octet-stream"),
        ];
        let blob = Blob::from_chunks(&chunks, "application/octet-stream");
        assert_eq!(blob.bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(blob.mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_extension_ignores_codec_parameters() {
        assert_eq!(extension_for_mime("audio/webm;codecs=opus"), "webm");
        assert_eq!(extension_for_mime("audio/wav"), "wav");
        assert_eq!(extension_for_mime("audio/x-wav"), "wav");
        assert_eq!(extension_for_mime("text/plain"), "bin");
    }

    #[test]
    fn test_memory_store_resolves_and_revokes() {
        let store = MemoryBlobStore::new();
        let blob = Blob::new(vec![9u8; 4], "audio/wav");
        let url = store.create_object_url(&blob).unwrap();

        assert!(url.starts_with("blob:"));
        assert_eq!(store.resolve(&url), Some(blob));

        store.revoke_object_url(&url);
        assert!(store.resolve(&url).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("recordings"));
        let blob = Blob::new(vec![7u8; 16], "audio/wav");

        let url = store.create_object_url(&blob).unwrap();
        let path = store.resolve(&url).expect("url should resolve");
        assert_eq!(path.extension().unwrap(), "wav");
        assert_eq!(fs::read(&path).unwrap(), vec![7u8; 16]);

        store.revoke_object_url(&url);
        assert!(!path.exists());
        assert!(store.resolve(&url).is_none());
    }

    #[test]
    fn test_file_store_ignores_foreign_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path());
        assert!(store.resolve("file:///etc/hostname").is_none());
        assert!(store.resolve("blob:micwave/abc").is_none());
    }

    #[test]
    fn test_file_store_rejects_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("recordings");
        fs::create_dir_all(&store_dir).unwrap();
        let outside = dir.path().join("keep.txt");
        fs::write(&outside, b"keep").unwrap();

        let store = FileBlobStore::new(&store_dir);
        let url = format!("file://{}/../keep.txt", store_dir.display());
        assert!(store.resolve(&url).is_none());

        store.revoke_object_url(&url);
        assert!(outside.exists());
    }

    #[test]
    fn test_artifact_summary() {
        let artifact = ResultArtifact {
            blob: Blob::new(vec![0u8; 10], "audio/wav"),
            start_time: 1_000,
            stop_time: 3_500,
            options: RecordingOptions::default().with_mime_type("audio/wav"),
            blob_url: "blob:micwave/x".to_string(),
        };
        let summary = artifact.summary();
        assert_eq!(artifact.duration_ms(), 2_500);
        assert_eq!(summary.size_bytes, 10);
        assert_eq!(summary.mime_type, "audio/wav");
        assert_eq!(summary.audio_bits_per_second, 128_000);
    }
}
