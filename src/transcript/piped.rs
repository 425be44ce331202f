//! Piped API client.
//!
//! Wraps the ordered list of Piped instances with per-request retries and
//! linear whole-second backoff. Captions and audio acquisition both go
//! through this client.

use crate::config::PipedSettings;
use crate::error::{Result, YtqaError};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Stream information returned by `/streams/{video_id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamsResponse {
    #[serde(default)]
    pub audio_streams: Vec<AudioStream>,
    #[serde(default)]
    pub subtitles: Vec<SubtitleTrack>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// One downloadable audio rendition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStream {
    pub url: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub bitrate: u64,
}

/// One caption track.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub url: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub auto_generated: bool,
}

/// HTTP client over the configured Piped instances.
#[derive(Debug, Clone)]
pub struct PipedClient {
    http: reqwest::Client,
    instances: Vec<String>,
    max_retries: u32,
}

impl PipedClient {
    pub fn new(settings: &PipedSettings) -> Result<Self> {
        // Some instances serve self-signed certificates.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            http,
            instances: settings.instances.clone(),
            max_retries: settings.max_retries.max(1),
        })
    }

    /// The configured instances, in priority order.
    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    /// GET with bounded retries and linear backoff (1s, 2s, ...).
    pub async fn get_with_retries(&self, url: &str) -> Result<reqwest::Response> {
        let mut last_err: Option<YtqaError> = None;

        for attempt in 0..self.max_retries {
            match self.http.get(url).send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => return Ok(response),
                    Err(e) => {
                        warn!(
                            "Request to {} failed (attempt {}/{}): {}",
                            url,
                            attempt + 1,
                            self.max_retries,
                            e
                        );
                        last_err = Some(e.into());
                    }
                },
                Err(e) => {
                    warn!(
                        "Request to {} failed (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    last_err = Some(e.into());
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(Duration::from_secs((attempt + 1) as u64)).await;
            }
        }

        Err(last_err
            .unwrap_or_else(|| YtqaError::AudioAcquisition(format!("request to {} failed", url))))
    }

    /// Probe an instance's health endpoint.
    pub async fn is_healthy(&self, instance: &str) -> bool {
        match self
            .get_with_retries(&format!("{}/healthcheck", instance))
            .await
        {
            Ok(_) => {
                debug!("Instance {} is healthy", instance);
                true
            }
            Err(_) => {
                warn!("Instance {} is not available", instance);
                false
            }
        }
    }

    /// Fetch stream information for a video from a specific instance.
    pub async fn streams(&self, instance: &str, video_id: &str) -> Result<StreamsResponse> {
        let response = self
            .get_with_retries(&format!("{}/streams/{}", instance, video_id))
            .await?;
        Ok(response.json::<StreamsResponse>().await?)
    }

    /// Download a URL's body to a file.
    pub async fn download_to(&self, url: &str, dest: &std::path::Path) -> Result<()> {
        let response = self.get_with_retries(url).await?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    /// Fetch a URL's body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get_with_retries(url).await?;
        Ok(response.text().await?)
    }
}

/// Pick the best audio stream: prefer m4a/mp4 containers, then highest bitrate.
pub fn best_audio_stream(streams: &[AudioStream]) -> Option<&AudioStream> {
    streams.iter().max_by_key(|s| {
        let preferred = matches!(s.format.to_lowercase().as_str(), "m4a" | "mp4");
        (preferred, s.bitrate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(format: &str, bitrate: u64) -> AudioStream {
        AudioStream {
            url: "https://example.com/a".to_string(),
            format: format.to_string(),
            bitrate,
        }
    }

    #[test]
    fn test_best_audio_stream_prefers_m4a() {
        let streams = vec![stream("WEBMA_OPUS", 160_000), stream("M4A", 128_000)];
        let best = best_audio_stream(&streams).unwrap();
        assert_eq!(best.format, "M4A");
    }

    #[test]
    fn test_best_audio_stream_falls_back_to_bitrate() {
        let streams = vec![stream("WEBMA_OPUS", 64_000), stream("WEBMA_OPUS", 160_000)];
        let best = best_audio_stream(&streams).unwrap();
        assert_eq!(best.bitrate, 160_000);
    }

    #[test]
    fn test_best_audio_stream_empty() {
        assert!(best_audio_stream(&[]).is_none());
    }
}
