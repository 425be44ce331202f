//! Core data model: transcript segments, topic blocks, store metadata, answers.

use serde::{Deserialize, Serialize};

/// A single timestamped transcript unit.
///
/// Merged chunks produced by [`crate::merge::merge_segments`] reuse this type:
/// their text is the space-joined concatenation of the contributors and their
/// duration the contributors' summed durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// Start time in seconds from the beginning of the video.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl Segment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A labeled chapter spanning one or more segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicBlock {
    pub title: String,
    /// Start time of the block in seconds.
    pub start: f64,
    /// Segments covered by this block, in order.
    pub segments: Vec<Segment>,
}

/// Metadata record stored alongside each vector in the store.
///
/// Position `i` in the vector index corresponds exactly to position `i` in
/// the metadata list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub video_id: String,
    pub text: String,
    pub start: f64,
    pub duration: f64,
    pub chunk_index: usize,
}

/// A retrieved chunk with its squared Euclidean distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// Response to a question with the retrieved context. Transient, not persisted.
#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub context: Vec<ScoredChunk>,
    pub confidence: Option<f32>,
}

/// Format a time in seconds as MM:SS (or HH:MM:SS past an hour).
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_end() {
        let seg = Segment::new("hello", 10.0, 2.5);
        assert_eq!(seg.end(), 12.5);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(125.0), "02:05");
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(3725.0), "01:02:05");
    }
}
