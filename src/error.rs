//! Error types for ytqa.

use thiserror::Error;

/// Library-level error type for ytqa operations.
#[derive(Error, Debug)]
pub enum YtqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcript unavailable for video {0}: caption and audio paths exhausted")]
    TranscriptUnavailable(String),

    #[error("Audio acquisition failed: {0}")]
    AudioAcquisition(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector/metadata input mismatch: {0}")]
    InputMismatch(String),

    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Topic extraction failed: {0}")]
    TopicExtraction(String),

    #[error("Answer generation failed: {0}")]
    Qa(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),
}

/// Result type alias for ytqa operations.
pub type Result<T> = std::result::Result<T, YtqaError>;
