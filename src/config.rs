//! Configuration settings for ytqa.
//!
//! Every component receives its configuration explicitly through `Settings`;
//! there is no ambient mutable state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub piped: PipedSettings,
    pub transcript: TranscriptSettings,
    pub embedding: EmbeddingSettings,
    pub topics: TopicSettings,
    pub qa: QaSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for cached transcripts, audio, embeddings, and the vector index.
    pub cache_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            cache_dir: "~/.ytqa/cache".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Piped API endpoint settings for caption and audio retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipedSettings {
    /// Ordered list of Piped instances, tried first to last.
    pub instances: Vec<String>,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Attempts per HTTP request before moving on.
    pub max_retries: u32,
}

impl Default for PipedSettings {
    fn default() -> Self {
        Self {
            instances: vec![
                "https://pipedapi.kavin.rocks".to_string(),
                "https://api.piped.video".to_string(),
                "https://pipedapi.tokhmi.xyz".to_string(),
            ],
            timeout_seconds: 10,
            max_retries: 3,
        }
    }
}

/// Transcript acquisition and merging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Preferred caption language code.
    pub language: String,
    /// Target duration for merged transcript chunks in seconds.
    pub target_chunk_seconds: f64,
    /// Whisper model for the speech-to-text fallback.
    pub whisper_model: String,
    /// Maximum audio payload size per Whisper request in bytes.
    pub max_file_size_bytes: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            target_chunk_seconds: 60.0,
            whisper_model: "whisper-1".to_string(),
            max_file_size_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions (must match the model).
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
        }
    }
}

/// Topic segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSettings {
    /// Model for topic extraction.
    pub model: String,
    /// Maximum duration of a materialized topic block in seconds.
    pub max_block_seconds: f64,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            max_block_seconds: 360.0,
        }
    }
}

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSettings {
    /// Model for answer generation.
    pub model: String,
    /// Default number of chunks retrieved for context.
    pub max_context_chunks: usize,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            max_context_chunks: 5,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::YtqaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ytqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded cache directory path.
    pub fn cache_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.cache_dir)
    }
}
