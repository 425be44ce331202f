//! Pipeline orchestrator.
//!
//! Composes transcript acquisition, embedding, the vector store, topic
//! segmentation, and answer generation into the user-facing operations.

use crate::cache::TranscriptCache;
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, YtqaError};
use crate::models::{Answer, ChunkMetadata, ScoredChunk, Segment, TopicBlock};
use crate::qa::AnswerEngine;
use crate::topics::{fallback_block, TopicSegmenter};
use crate::transcript::TranscriptFactory;
use crate::vector_store::FlatVectorStore;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, instrument, warn};
use url::Url;

/// Extract a video id from a recognized YouTube URL shape.
///
/// Accepts `youtube.com/watch?v=<id>` and `youtu.be/<id>`; anything else is
/// `InvalidUrl`.
pub fn extract_video_id(input: &str) -> Result<String> {
    static VIDEO_ID: OnceLock<Regex> = OnceLock::new();
    let video_id_regex =
        VIDEO_ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex"));

    let parsed = Url::parse(input).map_err(|_| YtqaError::InvalidUrl(input.to_string()))?;

    let id = match parsed.host_str() {
        Some("youtube.com") | Some("www.youtube.com") if parsed.path() == "/watch" => parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned()),
        Some("youtu.be") | Some("www.youtu.be") => {
            let path = parsed.path().trim_start_matches('/');
            (!path.is_empty()).then(|| path.to_string())
        }
        _ => None,
    };

    match id {
        Some(id) if video_id_regex.is_match(&id) => Ok(id),
        _ => Err(YtqaError::InvalidUrl(input.to_string())),
    }
}

/// Result of processing a video.
#[derive(Debug)]
pub struct ProcessSummary {
    /// Video id extracted from the URL.
    pub video_id: String,
    /// Merged transcript chunks that were indexed.
    pub chunks: Vec<Segment>,
    /// Topic blocks (extracted or fallback).
    pub topics: Vec<TopicBlock>,
}

/// The main orchestrator for the ytqa pipeline.
pub struct Orchestrator {
    transcript_factory: TranscriptFactory,
    embedder: Box<dyn Embedder>,
    vector_store: FlatVectorStore,
    segmenter: TopicSegmenter,
    answer_engine: AnswerEngine,
    cache: TranscriptCache,
}

impl Orchestrator {
    /// Create an orchestrator with the default component set.
    pub fn new(settings: &Settings) -> Result<Self> {
        let cache = TranscriptCache::new(settings.cache_dir())?;
        let transcript_factory = TranscriptFactory::new(settings, cache.clone())?;

        let embedder = Box::new(OpenAIEmbedder::new(
            &settings.embedding.model,
            settings.embedding.dimensions,
            settings.cache_dir(),
        )?);

        let vector_store = FlatVectorStore::new(settings.embedding.dimensions, settings.cache_dir())?;
        let segmenter = TopicSegmenter::new(&settings.topics.model, settings.topics.max_block_seconds);
        let answer_engine = AnswerEngine::new(&settings.qa.model);

        Ok(Self {
            transcript_factory,
            embedder,
            vector_store,
            segmenter,
            answer_engine,
            cache,
        })
    }

    /// Create an orchestrator with custom components. Used by tests.
    pub fn with_components(
        transcript_factory: TranscriptFactory,
        embedder: Box<dyn Embedder>,
        vector_store: FlatVectorStore,
        segmenter: TopicSegmenter,
        answer_engine: AnswerEngine,
        cache: TranscriptCache,
    ) -> Self {
        Self {
            transcript_factory,
            embedder,
            vector_store,
            segmenter,
            answer_engine,
            cache,
        }
    }

    /// Process a video: fetch the transcript, embed and index the chunks,
    /// and run topic analysis.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn process_video(&mut self, url: &str) -> Result<ProcessSummary> {
        let video_id = extract_video_id(url)?;

        info!("Getting transcript for video {}", video_id);
        let chunks = self.transcript_factory.get_transcript(&video_id).await?;
        if chunks.is_empty() {
            return Err(YtqaError::TranscriptUnavailable(video_id));
        }

        info!("Creating embeddings for {} chunks", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let metadata: Vec<ChunkMetadata> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| ChunkMetadata {
                video_id: video_id.clone(),
                text: chunk.text.clone(),
                start: chunk.start,
                duration: chunk.duration,
                chunk_index: i,
            })
            .collect();

        info!("Adding vectors to store for video {}", video_id);
        self.vector_store.add(embeddings, metadata)?;

        // Topic analysis degrades rather than failing the whole flow.
        let topics = match self.analyze_topics(&video_id).await {
            Ok(topics) => topics,
            Err(e) => {
                warn!("Topic analysis failed: {}", e);
                vec![fallback_block(&chunks)]
            }
        };

        Ok(ProcessSummary {
            video_id,
            chunks,
            topics,
        })
    }

    /// Topic blocks for a video, from cache when available.
    ///
    /// Extraction errors are recovered by substituting a single block spanning
    /// the whole transcript; the fallback is not cached so a later run can
    /// retry extraction.
    #[instrument(skip(self))]
    pub async fn analyze_topics(&self, video_id: &str) -> Result<Vec<TopicBlock>> {
        if let Some(cached) = self.cache.load_topics(video_id)? {
            info!("Loaded {} cached topics for video {}", cached.len(), video_id);
            return Ok(cached);
        }

        let segments = self.transcript_factory.get_transcript(video_id).await?;

        match self.segmenter.extract(&segments).await {
            Ok(topics) => {
                self.cache.save_topics(video_id, &topics)?;
                Ok(topics)
            }
            Err(e) => {
                warn!("Failed to extract topics, using fallback: {}", e);
                Ok(vec![fallback_block(&segments)])
            }
        }
    }

    /// Search the indexed transcripts with a free-text query.
    pub async fn search_transcript(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        self.vector_store.search(&query_embedding, k)
    }

    /// Answer a question about indexed video content.
    ///
    /// The optional video-id filter is applied after retrieval, so it can
    /// reduce the effective number of context chunks below `k`.
    pub async fn answer_question(
        &self,
        query: &str,
        video_id: Option<&str>,
        k: usize,
    ) -> Result<Answer> {
        let mut chunks = self.search_transcript(query, k).await?;

        if let Some(video_id) = video_id {
            chunks.retain(|c| c.metadata.video_id == video_id);
        }

        self.answer_engine.answer(query, chunks).await
    }

    /// All indexed chunks for a video, ordered by start time.
    pub fn get_video_transcript(&self, video_id: &str) -> Vec<ChunkMetadata> {
        let mut chunks: Vec<ChunkMetadata> = self
            .vector_store
            .get_all_metadata()
            .into_iter()
            .filter(|m| m.video_id == video_id)
            .collect();
        chunks.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        chunks
    }

    /// Wipe the vector store.
    pub fn clear_store(&mut self) -> Result<()> {
        self.vector_store.clear()
    }

    /// Number of indexed chunks.
    pub fn indexed_chunks(&self) -> usize {
        self.vector_store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSource;
    use async_trait::async_trait;

    #[test]
    fn test_extract_video_id_shapes() {
        assert_eq!(extract_video_id("https://youtu.be/abc123").unwrap(), "abc123");
        assert_eq!(
            extract_video_id("https://youtube.com/watch?v=xyz").unwrap(),
            "xyz"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        assert!(matches!(
            extract_video_id("not a url"),
            Err(YtqaError::InvalidUrl(_))
        ));
        assert!(matches!(
            extract_video_id("https://example.com/watch?v=abc"),
            Err(YtqaError::InvalidUrl(_))
        ));
        assert!(matches!(
            extract_video_id("https://youtube.com/playlist?list=PL1"),
            Err(YtqaError::InvalidUrl(_))
        ));
    }

    struct FixedSource(Vec<Segment>);

    #[async_trait]
    impl TranscriptSource for FixedSource {
        async fn fetch(&self, _video_id: &str) -> Result<Vec<Segment>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TranscriptSource for FailingSource {
        async fn fetch(&self, _video_id: &str) -> Result<Vec<Segment>> {
            Err(YtqaError::Transcription("captions disabled".into()))
        }
    }

    /// Deterministic embedder: vector depends only on text length.
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn orchestrator_with(
        captions: Box<dyn TranscriptSource>,
        audio: Box<dyn TranscriptSource>,
        tmp: &tempfile::TempDir,
    ) -> Orchestrator {
        let cache = TranscriptCache::new(tmp.path()).unwrap();
        let factory = TranscriptFactory::with_sources(captions, audio, cache.clone(), 60.0);
        let store = FlatVectorStore::new(3, tmp.path()).unwrap();

        Orchestrator::with_components(
            factory,
            Box::new(StubEmbedder),
            store,
            TopicSegmenter::new("gpt-4.1-nano", 360.0),
            AnswerEngine::new("gpt-4.1-nano"),
            cache,
        )
    }

    #[tokio::test]
    async fn test_process_video_indexes_chunks() {
        let tmp = tempfile::tempdir().unwrap();
        let segments = vec![
            Segment::new("Hello", 0.0, 1.0),
            Segment::new("World", 1.0, 1.0),
        ];
        let mut orchestrator = orchestrator_with(
            Box::new(FixedSource(segments)),
            Box::new(FailingSource),
            &tmp,
        );

        // Pre-seed the topics cache so analysis never reaches the network.
        let cache = TranscriptCache::new(tmp.path()).unwrap();
        cache
            .save_topics(
                "abc123",
                &[TopicBlock {
                    title: "Intro".to_string(),
                    start: 0.0,
                    segments: vec![Segment::new("Hello World", 0.0, 2.0)],
                }],
            )
            .unwrap();

        let summary = orchestrator
            .process_video("https://youtu.be/abc123")
            .await
            .unwrap();

        assert_eq!(summary.video_id, "abc123");
        assert_eq!(summary.chunks.len(), 1);
        assert_eq!(summary.chunks[0].text, "Hello World");
        assert_eq!(summary.topics.len(), 1);
        assert_eq!(orchestrator.indexed_chunks(), 1);

        let transcript = orchestrator.get_video_transcript("abc123");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].chunk_index, 0);
    }

    #[tokio::test]
    async fn test_process_video_falls_back_to_audio() {
        let tmp = tempfile::tempdir().unwrap();
        let audio_segments = vec![Segment::new("from whisper", 0.0, 5.0)];
        let mut orchestrator = orchestrator_with(
            Box::new(FailingSource),
            Box::new(FixedSource(audio_segments)),
            &tmp,
        );

        let cache = TranscriptCache::new(tmp.path()).unwrap();
        cache
            .save_topics(
                "abc123",
                &[TopicBlock {
                    title: "All".to_string(),
                    start: 0.0,
                    segments: vec![Segment::new("from whisper", 0.0, 5.0)],
                }],
            )
            .unwrap();

        let summary = orchestrator
            .process_video("https://youtu.be/abc123")
            .await
            .unwrap();
        assert!(!summary.chunks.is_empty());
        assert_eq!(summary.chunks[0].text, "from whisper");
    }

    #[tokio::test]
    async fn test_search_transcript_finds_nearest() {
        let tmp = tempfile::tempdir().unwrap();
        let segments = vec![Segment::new("Hello", 0.0, 1.0)];
        let mut orchestrator = orchestrator_with(
            Box::new(FixedSource(segments)),
            Box::new(FailingSource),
            &tmp,
        );

        let cache = TranscriptCache::new(tmp.path()).unwrap();
        cache.save_topics("abc123", &[]).unwrap();
        orchestrator
            .process_video("https://youtu.be/abc123")
            .await
            .unwrap();

        // StubEmbedder maps equal-length texts to equal vectors.
        let results = orchestrator.search_transcript("Hello", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.video_id, "abc123");
        assert!(results[0].distance.abs() < 1e-6);
    }
}
