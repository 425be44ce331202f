//! Transcript acquisition: providers, fallback, merging, caching.
//!
//! Two [`TranscriptSource`] variants are tried in sequence: platform captions
//! first, then the speech-to-text fallback. The factory merges whatever a
//! provider returns and caches the merged transcript per video id.

mod audio;
mod captions;
pub mod piped;

pub use audio::AudioTranscriptionProvider;
pub use captions::CaptionProvider;
pub use piped::PipedClient;

use crate::cache::TranscriptCache;
use crate::config::Settings;
use crate::error::{Result, YtqaError};
use crate::merge::merge_segments;
use crate::models::Segment;
use async_trait::async_trait;
use tracing::{info, warn};

/// A source of transcript segments for a video.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch ordered segments for a video id. An `Err` means this source
    /// cannot serve the video and the next source should be tried.
    async fn fetch(&self, video_id: &str) -> Result<Vec<Segment>>;
}

/// Orchestrates caption → audio fallback, merging, and caching.
pub struct TranscriptFactory {
    captions: Box<dyn TranscriptSource>,
    audio: Box<dyn TranscriptSource>,
    cache: TranscriptCache,
    target_chunk_seconds: f64,
}

impl TranscriptFactory {
    /// Build the factory with the default provider pair.
    pub fn new(settings: &Settings, cache: TranscriptCache) -> Result<Self> {
        let client = PipedClient::new(&settings.piped)?;

        let captions = CaptionProvider::new(
            client.clone(),
            cache.clone(),
            &settings.transcript.language,
        );
        let audio = AudioTranscriptionProvider::new(
            client,
            cache.clone(),
            &settings.transcript.whisper_model,
            settings.transcript.max_file_size_bytes,
            settings.transcript.target_chunk_seconds,
        );

        Ok(Self {
            captions: Box::new(captions),
            audio: Box::new(audio),
            cache,
            target_chunk_seconds: settings.transcript.target_chunk_seconds,
        })
    }

    /// Build the factory with explicit sources. Used by tests.
    pub fn with_sources(
        captions: Box<dyn TranscriptSource>,
        audio: Box<dyn TranscriptSource>,
        cache: TranscriptCache,
        target_chunk_seconds: f64,
    ) -> Self {
        Self {
            captions,
            audio,
            cache,
            target_chunk_seconds,
        }
    }

    /// The cache backing this factory.
    pub fn cache(&self) -> &TranscriptCache {
        &self.cache
    }

    /// Get the merged transcript for a video, deterministic per id once cached.
    ///
    /// A cached merged transcript is returned verbatim. Otherwise captions are
    /// tried first, then the audio fallback; the result is merged to the
    /// target chunk duration and persisted.
    pub async fn get_transcript(&self, video_id: &str) -> Result<Vec<Segment>> {
        if let Some(cached) = self.cache.load_merged(video_id)? {
            info!("Loaded cached merged transcript for video {}", video_id);
            return Ok(cached);
        }

        let segments = match self.captions.fetch(video_id).await {
            Ok(segments) => segments,
            Err(caption_err) => {
                warn!(
                    "Captions not available, falling back to audio transcription: {}",
                    caption_err
                );
                self.audio.fetch(video_id).await.map_err(|audio_err| {
                    warn!("Audio transcription failed: {}", audio_err);
                    YtqaError::TranscriptUnavailable(video_id.to_string())
                })?
            }
        };

        let chunks = merge_segments(&segments, self.target_chunk_seconds);
        info!(
            "Merged {} segments into {} chunks",
            segments.len(),
            chunks.len()
        );

        self.cache.save_merged(video_id, &chunks)?;
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<Segment>);

    #[async_trait]
    impl TranscriptSource for FixedSource {
        async fn fetch(&self, _video_id: &str) -> Result<Vec<Segment>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource(&'static str);

    #[async_trait]
    impl TranscriptSource for FailingSource {
        async fn fetch(&self, _video_id: &str) -> Result<Vec<Segment>> {
            Err(YtqaError::Transcription(self.0.to_string()))
        }
    }

    fn factory_with(
        captions: Box<dyn TranscriptSource>,
        audio: Box<dyn TranscriptSource>,
    ) -> (TranscriptFactory, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TranscriptCache::new(tmp.path()).unwrap();
        (
            TranscriptFactory::with_sources(captions, audio, cache, 60.0),
            tmp,
        )
    }

    #[tokio::test]
    async fn test_merges_and_caches() {
        let segments = vec![
            Segment::new("Hello", 0.0, 1.0),
            Segment::new("World", 1.0, 1.0),
        ];
        let (factory, _tmp) = factory_with(
            Box::new(FixedSource(segments)),
            Box::new(FailingSource("unused")),
        );

        let chunks = factory.get_transcript("abc123").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello World");
        assert_eq!(chunks[0].start, 0.0);
        assert_eq!(chunks[0].duration, 2.0);

        // Second call is served from the merged cache.
        let cached = factory.cache().load_merged("abc123").unwrap().unwrap();
        assert_eq!(cached, chunks);
        let again = factory.get_transcript("abc123").await.unwrap();
        assert_eq!(again, chunks);
    }

    #[tokio::test]
    async fn test_falls_back_to_audio_when_captions_disabled() {
        let audio_segments = vec![Segment::new("from whisper", 0.0, 5.0)];
        let (factory, _tmp) = factory_with(
            Box::new(FailingSource("captions disabled")),
            Box::new(FixedSource(audio_segments)),
        );

        let chunks = factory.get_transcript("abc123").await.unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].text, "from whisper");
    }

    #[tokio::test]
    async fn test_both_providers_failing_is_transcript_unavailable() {
        let (factory, _tmp) = factory_with(
            Box::new(FailingSource("captions disabled")),
            Box::new(FailingSource("all instances failed")),
        );

        let err = factory.get_transcript("abc123").await.unwrap_err();
        assert!(matches!(err, YtqaError::TranscriptUnavailable(_)));
    }
}
