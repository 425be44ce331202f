//! Disk cache for transcripts, topic blocks, and audio artifacts.
//!
//! Files are keyed by video id within a single cache directory:
//! `<id>.json` raw segments, `<id>_merged.json` merged chunks,
//! `<id>_topics.json` topic blocks, `<id>.mp3`/`<id>.wav` audio artifacts.
//! A cache miss is never an error, only `None`.

use crate::error::Result;
use crate::models::{Segment, TopicBlock};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-based cache keyed by video id.
#[derive(Debug, Clone)]
pub struct TranscriptCache {
    dir: PathBuf,
}

impl TranscriptCache {
    /// Open (and create if necessary) a cache rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a cached file with the given suffix, e.g. `.json` or `_merged.json`.
    pub fn path_for(&self, video_id: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", video_id, suffix))
    }

    /// Path of the cached compressed audio for a video.
    pub fn audio_mp3_path(&self, video_id: &str) -> PathBuf {
        self.path_for(video_id, ".mp3")
    }

    /// Path of the cached decoded audio for a video.
    pub fn audio_wav_path(&self, video_id: &str) -> PathBuf {
        self.path_for(video_id, ".wav")
    }

    /// Load raw transcript segments, if previously saved.
    pub fn load_segments(&self, video_id: &str) -> Result<Option<Vec<Segment>>> {
        self.load_json(&self.path_for(video_id, ".json"))
    }

    /// Save raw transcript segments.
    pub fn save_segments(&self, video_id: &str, segments: &[Segment]) -> Result<()> {
        self.save_json(&self.path_for(video_id, ".json"), segments)
    }

    /// Load merged transcript chunks, if previously saved.
    pub fn load_merged(&self, video_id: &str) -> Result<Option<Vec<Segment>>> {
        self.load_json(&self.path_for(video_id, "_merged.json"))
    }

    /// Save merged transcript chunks.
    pub fn save_merged(&self, video_id: &str, chunks: &[Segment]) -> Result<()> {
        self.save_json(&self.path_for(video_id, "_merged.json"), chunks)
    }

    /// Load cached topic blocks, if previously saved.
    pub fn load_topics(&self, video_id: &str) -> Result<Option<Vec<TopicBlock>>> {
        self.load_json(&self.path_for(video_id, "_topics.json"))
    }

    /// Save topic blocks.
    pub fn save_topics(&self, video_id: &str, topics: &[TopicBlock]) -> Result<()> {
        self.save_json(&self.path_for(video_id, "_topics.json"), topics)
    }

    /// Remove any audio artifacts for a video. Used to clean up partial downloads.
    pub fn remove_audio_artifacts(&self, video_id: &str) {
        for path in [self.audio_mp3_path(video_id), self.audio_wav_path(video_id)] {
            if path.exists() {
                let _ = std::fs::remove_file(&path);
            }
        }
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!("Loading cached file {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_json<T: serde::Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string(value)?;
        std::fs::write(path, content)?;
        debug!("Cached file {}", path.display());
        Ok(())
    }
}
