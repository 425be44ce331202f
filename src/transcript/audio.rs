//! Speech-to-text fallback provider.
//!
//! Downloads audio through the Piped instances, transcodes it to a canonical
//! decoded form with ffmpeg, splits it to satisfy the Whisper payload limit,
//! transcribes each piece with video-relative timestamps, and merges the
//! result. Used when no caption track is available.

use super::piped::{best_audio_stream, PipedClient};
use super::TranscriptSource;
use crate::cache::TranscriptCache;
use crate::error::{Result, YtqaError};
use crate::merge::merge_segments;
use crate::models::Segment;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Provider that produces segments via Whisper when captions are unavailable.
pub struct AudioTranscriptionProvider {
    client: PipedClient,
    cache: TranscriptCache,
    openai: async_openai::Client<OpenAIConfig>,
    model: String,
    max_file_size: u64,
    target_chunk_seconds: f64,
}

impl AudioTranscriptionProvider {
    pub fn new(
        client: PipedClient,
        cache: TranscriptCache,
        model: &str,
        max_file_size: u64,
        target_chunk_seconds: f64,
    ) -> Self {
        Self {
            client,
            cache,
            openai: crate::openai::create_client(),
            model: model.to_string(),
            max_file_size,
            target_chunk_seconds,
        }
    }

    /// Acquire decoded audio for a video, reusing cached artifacts.
    ///
    /// Tries each configured instance in order: health probe, stream lookup,
    /// then binary download. When every instance fails, partial artifacts are
    /// removed before surfacing the error.
    async fn acquire_audio(&self, video_id: &str) -> Result<PathBuf> {
        let wav_path = self.cache.audio_wav_path(video_id);
        if wav_path.exists() {
            info!("Using cached WAV file: {}", wav_path.display());
            return Ok(wav_path);
        }

        let mp3_path = self.cache.audio_mp3_path(video_id);
        if mp3_path.exists() {
            info!("Using cached MP3 file: {}", mp3_path.display());
            transcode_to_wav(&mp3_path, &wav_path).await?;
            return Ok(wav_path);
        }

        for instance in self.client.instances().to_vec() {
            if !self.client.is_healthy(&instance).await {
                continue;
            }

            debug!("Trying instance {} for video {}", instance, video_id);
            let streams = match self.client.streams(&instance, video_id).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("Stream lookup on {} failed: {}", instance, e);
                    continue;
                }
            };

            let Some(stream) = best_audio_stream(&streams.audio_streams) else {
                warn!("No audio streams found on {}", instance);
                continue;
            };

            info!("Downloading audio from {}", instance);
            if let Err(e) = self.client.download_to(&stream.url, &mp3_path).await {
                warn!("Audio download from {} failed: {}", instance, e);
                continue;
            }

            transcode_to_wav(&mp3_path, &wav_path).await?;
            return Ok(wav_path);
        }

        self.cache.remove_audio_artifacts(video_id);
        Err(YtqaError::AudioAcquisition(format!(
            "all Piped instances failed for video {}",
            video_id
        )))
    }

    /// Split decoded audio into equal-duration pieces when it exceeds the
    /// payload limit. Returns the chunk paths and the per-chunk duration used
    /// to reassemble video-relative timestamps.
    async fn split_audio(&self, audio_path: &Path, temp_dir: &Path) -> Result<(Vec<PathBuf>, f64)> {
        let file_size = std::fs::metadata(audio_path)?.len();
        let duration = probe_duration(audio_path).await?;

        if file_size <= self.max_file_size {
            return Ok((vec![audio_path.to_path_buf()], duration));
        }

        let num_chunks = file_size.div_ceil(self.max_file_size);
        let chunk_duration = duration / num_chunks as f64;
        info!(
            "Splitting {:.1}s of audio into {} chunks of {:.1}s",
            duration, num_chunks, chunk_duration
        );

        let mut chunks = Vec::with_capacity(num_chunks as usize);
        for i in 0..num_chunks {
            let chunk_path = temp_dir.join(format!("chunk_{}.wav", i));
            extract_segment(audio_path, &chunk_path, i as f64 * chunk_duration, chunk_duration)
                .await?;
            chunks.push(chunk_path);
        }

        Ok((chunks, chunk_duration))
    }

    /// Transcribe one audio chunk with segment-level timestamps.
    async fn transcribe_chunk(&self, chunk_path: &Path) -> Result<Vec<Segment>> {
        let file_bytes = tokio::fs::read(chunk_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                chunk_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.wav")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![TimestampGranularity::Segment])
            .build()
            .map_err(|e| YtqaError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .openai
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| YtqaError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments: Vec<Segment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .map(|s| {
                        Segment::new(
                            s.text.trim().to_string(),
                            s.start as f64,
                            (s.end - s.start) as f64,
                        )
                    })
                    .collect()
            })
            .unwrap_or_else(|| {
                // Some responses omit segments; fall back to one per chunk.
                vec![Segment::new(
                    response.text.trim().to_string(),
                    0.0,
                    response.duration as f64,
                )]
            });

        debug!("Transcribed {} segments", segments.len());
        Ok(segments)
    }
}

#[async_trait]
impl TranscriptSource for AudioTranscriptionProvider {
    async fn fetch(&self, video_id: &str) -> Result<Vec<Segment>> {
        if let Some(cached) = self.cache.load_segments(video_id)? {
            info!("Using cached transcript for video {}", video_id);
            return Ok(cached);
        }

        info!("No cached transcript for video {}, processing audio", video_id);
        let audio_path = self.acquire_audio(video_id).await?;

        // The tempdir scopes per-chunk files: they are removed on every exit
        // path, success or failure.
        let temp_dir = tempfile::tempdir()?;
        let (chunks, chunk_duration) = self.split_audio(&audio_path, temp_dir.path()).await?;

        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Whisper   [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("█▓░"),
        );

        let mut all_segments = Vec::new();
        for (i, chunk_path) in chunks.iter().enumerate() {
            let chunk_offset = i as f64 * chunk_duration;
            let mut segments = self.transcribe_chunk(chunk_path).await.map_err(|e| {
                pb.finish_and_clear();
                YtqaError::Transcription(format!(
                    "chunk {} at {:.0}s failed: {}",
                    i, chunk_offset, e
                ))
            })?;

            for segment in &mut segments {
                segment.start += chunk_offset;
            }
            all_segments.extend(segments);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let merged = merge_segments(&all_segments, self.target_chunk_seconds);
        info!(
            "Merged {} segments into {} chunks",
            all_segments.len(),
            merged.len()
        );

        self.cache.save_segments(video_id, &merged)?;
        Ok(merged)
    }
}

/// Convert compressed audio to 16 kHz mono PCM WAV using ffmpeg.
async fn transcode_to_wav(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {} to WAV", source.display());

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-acodec").arg("pcm_s16le")
        .arg("-ar").arg("16000")
        .arg("-ac").arg("1")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(YtqaError::Transcode(format!("ffmpeg conversion failed: {}", err)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(YtqaError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(YtqaError::Transcode(format!("ffmpeg error: {}", e))),
    }
}

/// Extract a time window from an audio file, re-encoded to WAV.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-acodec").arg("pcm_s16le")
        .arg("-ar").arg("16000")
        .arg("-ac").arg("1")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(YtqaError::Transcode(format!("segment extraction failed: {}", err)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(YtqaError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(YtqaError::Transcode(format!("ffmpeg error: {}", e))),
    }
}

/// Query the duration of an audio file using ffprobe.
async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(YtqaError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(YtqaError::Transcode(format!("ffprobe failed: {}", e)));
        }
    };

    if !output.status.success() {
        return Err(YtqaError::Transcode("ffprobe returned error".into()));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|_| YtqaError::Transcode("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| YtqaError::Transcode("Could not determine audio duration".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count_math() {
        // N = ceil(file_size / max_size)
        let max: u64 = 25 * 1024 * 1024;
        assert_eq!(max.div_ceil(max), 1);
        assert_eq!((max + 1).div_ceil(max), 2);
        assert_eq!((3 * max).div_ceil(max), 3);
    }
}
