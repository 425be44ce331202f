//! Segment merging.
//!
//! Collapses small timed segments into chunks of approximately a target
//! duration. Greedy, single pass, no backtracking; chunk boundaries always
//! fall on segment boundaries, never inside a segment.

use crate::models::Segment;

/// Merge segments into chunks of approximately `target_duration` seconds.
///
/// A chunk is closed when appending the next segment would push it past the
/// target and it already holds at least one segment, so a lone segment longer
/// than the target becomes its own chunk rather than being split.
pub fn merge_segments(segments: &[Segment], target_duration: f64) -> Vec<Segment> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current_texts: Vec<&str> = Vec::new();
    let mut current_start = segments[0].start;
    let mut current_duration = 0.0;

    for segment in segments {
        if current_duration + segment.duration > target_duration && !current_texts.is_empty() {
            chunks.push(Segment::new(
                current_texts.join(" "),
                current_start,
                current_duration,
            ));
            current_texts.clear();
            current_start = segment.start;
            current_duration = 0.0;
        }

        current_texts.push(segment.text.as_str());
        current_duration += segment.duration;
    }

    if !current_texts.is_empty() {
        chunks.push(Segment::new(
            current_texts.join(" "),
            current_start,
            current_duration,
        ));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, duration: f64) -> Segment {
        Segment::new(text, start, duration)
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_segments(&[], 60.0).is_empty());
    }

    #[test]
    fn test_two_segments_merge_into_one() {
        let segments = vec![seg("Hello", 0.0, 1.0), seg("World", 1.0, 1.0)];
        let chunks = merge_segments(&segments, 60.0);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello World");
        assert_eq!(chunks[0].start, 0.0);
        assert_eq!(chunks[0].duration, 2.0);
    }

    #[test]
    fn test_splits_at_target_duration() {
        let segments = vec![
            seg("a", 0.0, 40.0),
            seg("b", 40.0, 40.0),
            seg("c", 80.0, 40.0),
        ];
        let chunks = merge_segments(&segments, 60.0);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "a");
        assert_eq!(chunks[1].start, 40.0);
        assert_eq!(chunks[2].start, 80.0);
    }

    #[test]
    fn test_oversized_segment_is_its_own_chunk() {
        let segments = vec![seg("short", 0.0, 10.0), seg("long", 10.0, 120.0)];
        let chunks = merge_segments(&segments, 60.0);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "short");
        assert_eq!(chunks[1].text, "long");
        assert_eq!(chunks[1].duration, 120.0);
    }

    #[test]
    fn test_total_duration_is_conserved() {
        let segments: Vec<Segment> = (0..50)
            .map(|i| seg(&format!("seg{}", i), i as f64 * 7.0, 7.0))
            .collect();
        let chunks = merge_segments(&segments, 60.0);

        let input_total: f64 = segments.iter().map(|s| s.duration).sum();
        let output_total: f64 = chunks.iter().map(|c| c.duration).sum();
        assert!((input_total - output_total).abs() < 1e-9);

        // Chunks are ordered and contiguous: each starts where the previous ends.
        for pair in chunks.windows(2) {
            assert!((pair[0].end() - pair[1].start).abs() < 1e-9);
        }

        // No text lost or duplicated.
        let joined: Vec<&str> = chunks.iter().flat_map(|c| c.text.split(' ')).collect();
        assert_eq!(joined.len(), segments.len());
    }
}
