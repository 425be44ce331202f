//! Shared OpenAI client construction.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Timeout for OpenAI API requests. Whisper uploads of large audio chunks
/// need generous headroom, so this is deliberately long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Create an OpenAI client with the configured request timeout.
///
/// The API key is taken from the `OPENAI_API_KEY` environment variable.
pub fn create_client() -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok()
}
