//! Native caption provider.
//!
//! Fetches platform subtitles through the Piped stream listing and parses
//! YouTube's json3 caption events into segments. Fails when the video has no
//! usable caption track, which triggers the speech-to-text fallback.

use super::piped::{PipedClient, SubtitleTrack};
use super::TranscriptSource;
use crate::cache::TranscriptCache;
use crate::error::{Result, YtqaError};
use crate::models::Segment;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Caption document in YouTube json3 format.
#[derive(Debug, Deserialize)]
struct CaptionDocument {
    #[serde(default)]
    events: Vec<CaptionEvent>,
}

#[derive(Debug, Deserialize)]
struct CaptionEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<CaptionSeg>,
}

#[derive(Debug, Deserialize)]
struct CaptionSeg {
    #[serde(default)]
    utf8: String,
}

/// Provider for platform-native captions.
pub struct CaptionProvider {
    client: PipedClient,
    cache: TranscriptCache,
    language: String,
}

impl CaptionProvider {
    pub fn new(client: PipedClient, cache: TranscriptCache, language: &str) -> Self {
        Self {
            client,
            cache,
            language: language.to_string(),
        }
    }

    /// Pick the caption track for the configured language, preferring
    /// human-authored tracks over auto-generated ones.
    fn select_track<'a>(&self, tracks: &'a [SubtitleTrack]) -> Option<&'a SubtitleTrack> {
        let matching: Vec<&SubtitleTrack> = tracks
            .iter()
            .filter(|t| t.code == self.language || t.code.starts_with(&self.language))
            .collect();

        matching
            .iter()
            .find(|t| !t.auto_generated)
            .or_else(|| matching.first())
            .copied()
    }

    async fn fetch_from_instances(&self, video_id: &str) -> Result<Vec<Segment>> {
        for instance in self.client.instances().to_vec() {
            if !self.client.is_healthy(&instance).await {
                continue;
            }

            let streams = match self.client.streams(&instance, video_id).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("Stream lookup on {} failed: {}", instance, e);
                    continue;
                }
            };

            let Some(track) = self.select_track(&streams.subtitles) else {
                debug!("No {} caption track on {}", self.language, instance);
                continue;
            };

            // Caption URLs accept a format override; json3 carries timing.
            let url = if track.url.contains('?') {
                format!("{}&fmt=json3", track.url)
            } else {
                format!("{}?fmt=json3", track.url)
            };

            let body = match self.client.fetch_text(&url).await {
                Ok(b) => b,
                Err(e) => {
                    warn!("Caption download from {} failed: {}", instance, e);
                    continue;
                }
            };

            let segments = parse_json3_captions(&body)?;
            if segments.is_empty() {
                warn!("Caption track from {} was empty", instance);
                continue;
            }

            info!(
                "Fetched {} caption segments for {} from {}",
                segments.len(),
                video_id,
                instance
            );
            return Ok(segments);
        }

        Err(YtqaError::Transcription(format!(
            "no usable caption track for video {}",
            video_id
        )))
    }
}

#[async_trait]
impl TranscriptSource for CaptionProvider {
    async fn fetch(&self, video_id: &str) -> Result<Vec<Segment>> {
        if let Some(cached) = self.cache.load_segments(video_id)? {
            info!("Using cached transcript for video {}", video_id);
            return Ok(cached);
        }

        let segments = self.fetch_from_instances(video_id).await?;
        self.cache.save_segments(video_id, &segments)?;
        Ok(segments)
    }
}

/// Parse a json3 caption document into ordered segments.
///
/// Events without text (style/window markers) are skipped; newlines inside a
/// caption are flattened to spaces.
pub fn parse_json3_captions(body: &str) -> Result<Vec<Segment>> {
    let document: CaptionDocument = serde_json::from_str(body)?;

    let mut segments = Vec::new();
    for event in document.events {
        let text: String = event
            .segs
            .iter()
            .map(|s| s.utf8.as_str())
            .collect::<String>()
            .replace('\n', " ")
            .trim()
            .to_string();

        if text.is_empty() {
            continue;
        }

        segments.push(Segment::new(
            text,
            event.start_ms as f64 / 1000.0,
            event.duration_ms as f64 / 1000.0,
        ));
    }

    Ok(segments)
}
