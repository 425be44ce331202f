//! Topic segmentation.
//!
//! Sends the timestamped transcript to a labeling model and materializes the
//! returned chapter list into validated [`TopicBlock`]s. Membership is
//! re-derived from timestamps rather than trusting the model's index lists,
//! which protects against index drift.

use crate::error::{Result, YtqaError};
use crate::models::{Segment, TopicBlock};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Tolerance when matching a labeled start time to a transcript segment.
const START_MATCH_TOLERANCE: f64 = 1.0;

const SYSTEM_PROMPT_TOPICS: &str = r#"You are a seasoned video indexer.
Your goal: turn a chronological list of transcript segments (each with `start` seconds + text) into a set of concise, learner-oriented chapters that help viewers jump straight to the parts they care about.

Return only valid JSON with a single top-level key "topics" whose value is an array of objects sorted by `start`.
Each object must have:

- "title" - a noun phrase of at most 8 words summarising the block's main idea (avoid quotes, punctuation, emoji).
- "start" - floating-point seconds copied from the first segment in the block.
- "segments" - list of all segment indices (0-based, inclusive) that belong to this block, in order.

Guidelines
1. Build coherent blocks roughly 1-6 minutes long; combine adjacent segments until the topic clearly shifts.
2. Chapters must cover the entire video in order; no gaps, no overlaps.
3. Prefer broad thematic labels a learner would skim (e.g., "Vector Embeddings Basics", not "We talk about vectors").
4. If the video already contains obvious section markers, respect them, but still enforce the JSON schema.
5. Output nothing except the JSON object."#;

/// Raw labeling response shape.
#[derive(Debug, Deserialize)]
struct TopicsResponse {
    #[serde(default)]
    topics: Vec<RawTopic>,
}

#[derive(Debug, Deserialize)]
struct RawTopic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    #[allow(dead_code)]
    segments: Vec<usize>,
}

/// Extracts ordered, validated topic blocks from merged transcript segments.
pub struct TopicSegmenter {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    max_block_seconds: f64,
}

impl TopicSegmenter {
    pub fn new(model: &str, max_block_seconds: f64) -> Self {
        Self {
            client: crate::openai::create_client(),
            model: model.to_string(),
            max_block_seconds,
        }
    }

    /// Extract topic blocks covering the transcript.
    ///
    /// Fails with `TopicExtraction` when the model response is malformed or
    /// yields zero usable blocks; the caller substitutes the whole-video
    /// fallback in that case.
    pub async fn extract(&self, segments: &[Segment]) -> Result<Vec<TopicBlock>> {
        if segments.is_empty() {
            return Err(YtqaError::TopicExtraction("no segments to label".into()));
        }

        info!(
            "Extracting topics from {} segments with {}",
            segments.len(),
            self.model
        );

        let joined: String = segments
            .iter()
            .map(|s| format!("[{:.1}s] {}", s.start, s.text))
            .collect::<Vec<_>>()
            .join("\n");

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT_TOPICS)
                .build()
                .map_err(|e| YtqaError::TopicExtraction(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(joined)
                .build()
                .map_err(|e| YtqaError::TopicExtraction(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| YtqaError::TopicExtraction(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| YtqaError::OpenAI(format!("Topic labeling error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| YtqaError::TopicExtraction("empty labeling response".into()))?;

        let parsed: TopicsResponse = serde_json::from_str(content)
            .map_err(|e| YtqaError::TopicExtraction(format!("invalid JSON response: {}", e)))?;

        let topics = materialize_topics(segments, parsed, self.max_block_seconds);
        if topics.is_empty() {
            return Err(YtqaError::TopicExtraction(
                "no valid topics were extracted from the response".into(),
            ));
        }

        info!("Extracted {} topics", topics.len());
        Ok(topics)
    }
}

/// Turn raw labeled topics into validated blocks.
///
/// For each raw topic: clean the title, anchor it to the segment whose start
/// matches within 1 second, then greedily accumulate contiguous segments up
/// to the block duration cap. Topics with an empty title or no anchor are
/// dropped.
fn materialize_topics(
    segments: &[Segment],
    response: TopicsResponse,
    max_block_seconds: f64,
) -> Vec<TopicBlock> {
    let mut topics = Vec::new();

    for raw in response.topics {
        let title = raw.title.trim().trim_end_matches('.').to_string();
        if title.is_empty() {
            debug!("Skipping topic with empty title at {:.1}s", raw.start);
            continue;
        }

        let anchor = segments
            .iter()
            .position(|s| (s.start - raw.start).abs() < START_MATCH_TOLERANCE);

        let Some(anchor) = anchor else {
            warn!("No segment found for topic '{}' at {:.1}s", title, raw.start);
            continue;
        };

        let block_segments = segment_block(&segments[anchor..], max_block_seconds);
        if block_segments.is_empty() {
            warn!("No segments matched topic '{}' at {:.1}s", title, raw.start);
            continue;
        }

        topics.push(TopicBlock {
            title,
            start: raw.start,
            segments: block_segments,
        });
    }

    topics
}

/// Accumulate contiguous segments from the anchor up to `max_duration` seconds.
fn segment_block(segments: &[Segment], max_duration: f64) -> Vec<Segment> {
    let mut block = Vec::new();
    let mut total = 0.0;

    for segment in segments {
        if total + segment.duration > max_duration && !block.is_empty() {
            break;
        }
        total += segment.duration;
        block.push(segment.clone());
    }

    block
}

/// A single block spanning the whole transcript, used when extraction fails.
pub fn fallback_block(segments: &[Segment]) -> TopicBlock {
    TopicBlock {
        title: "Full Video Content".to_string(),
        start: segments.first().map(|s| s.start).unwrap_or(0.0),
        segments: segments.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs() -> Vec<Segment> {
        (0..10)
            .map(|i| Segment::new(format!("chunk {}", i), i as f64 * 60.0, 60.0))
            .collect()
    }

    fn raw(title: &str, start: f64) -> RawTopic {
        RawTopic {
            title: title.to_string(),
            start,
            segments: vec![],
        }
    }

    #[test]
    fn test_materialize_cleans_titles_and_anchors() {
        let segments = segs();
        let response = TopicsResponse {
            topics: vec![raw("  Introduction. ", 0.0), raw("Deep Dive", 360.0)],
        };

        let topics = materialize_topics(&segments, response, 360.0);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].title, "Introduction");
        assert_eq!(topics[0].segments.len(), 6); // capped at 360s of 60s chunks
        assert_eq!(topics[1].start, 360.0);
    }

    #[test]
    fn test_blocks_are_ordered_and_non_overlapping() {
        let segments = segs();
        let response = TopicsResponse {
            topics: vec![raw("First", 0.0), raw("Second", 360.0)],
        };

        let topics = materialize_topics(&segments, response, 360.0);
        assert!(topics.windows(2).all(|w| w[0].start <= w[1].start));

        // First block's covered segments end where or before the second begins.
        let first_end = topics[0].segments.last().unwrap().end();
        let second_start = topics[1].segments.first().unwrap().start;
        assert!(first_end <= second_start);
    }

    #[test]
    fn test_drops_empty_title_and_unanchored_topics() {
        let segments = segs();
        let response = TopicsResponse {
            topics: vec![raw("", 0.0), raw("Ghost", 1234.5), raw("Real", 120.0)],
        };

        let topics = materialize_topics(&segments, response, 360.0);
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].title, "Real");
    }

    #[test]
    fn test_anchor_tolerance_is_one_second() {
        let segments = segs();
        let within = TopicsResponse {
            topics: vec![raw("Close", 60.9)],
        };
        assert_eq!(materialize_topics(&segments, within, 360.0).len(), 1);

        let outside = TopicsResponse {
            topics: vec![raw("Far", 61.1)],
        };
        assert!(materialize_topics(&segments, outside, 360.0).is_empty());
    }

    #[test]
    fn test_fallback_block_spans_everything() {
        let segments = segs();
        let block = fallback_block(&segments);
        assert_eq!(block.title, "Full Video Content");
        assert_eq!(block.start, 0.0);
        assert_eq!(block.segments.len(), segments.len());
    }
}
