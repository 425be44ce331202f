//! Embedding generation with per-text content-addressed caching.

use crate::error::{Result, YtqaError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, order-preserving.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// OpenAI-based embedder with a content-hash file cache.
///
/// Each embedding is cached as `<md5(text)>.json` holding one float vector,
/// so repeat runs over the same transcript skip the API entirely.
pub struct OpenAIEmbedder {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
    cache_dir: PathBuf,
}

impl OpenAIEmbedder {
    pub fn new(model: &str, dimensions: usize, cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            client: crate::openai::create_client(),
            model: model.to_string(),
            dimensions,
            cache_dir,
        })
    }

    fn cache_path(&self, text: &str) -> PathBuf {
        let digest = md5::compute(text.as_bytes());
        self.cache_dir.join(format!("{:x}.json", digest))
    }

    fn load_cached(&self, text: &str) -> Option<Vec<f32>> {
        let path = self.cache_path(text);
        if !path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn save_cached(&self, text: &str, embedding: &[f32]) -> Result<()> {
        let content = serde_json::to_string(embedding)?;
        std::fs::write(self.cache_path(text), content)?;
        Ok(())
    }

    /// One API call for all the given texts, order-preserving.
    async fn request_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| YtqaError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| YtqaError::OpenAI(format!("Embedding API error: {}", e)))?;

        let mut data: Vec<_> = response.data.into_iter().collect();
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.load_cached(text) {
            debug!("Embedding cache hit");
            return Ok(cached);
        }

        let mut embeddings = self.request_embeddings(vec![text.to_string()]).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| YtqaError::Embedding("Empty embedding response".to_string()))?;

        self.save_cached(text, &embedding)?;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match self.load_cached(text) {
                Some(embedding) => results.push(Some(embedding)),
                None => {
                    results.push(None);
                    uncached_texts.push(text.clone());
                    uncached_indices.push(i);
                }
            }
        }

        if !uncached_texts.is_empty() {
            debug!("Generating embeddings for {} texts", uncached_texts.len());
            let embeddings = self.request_embeddings(uncached_texts.clone()).await?;
            if embeddings.len() != uncached_indices.len() {
                return Err(YtqaError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    uncached_indices.len(),
                    embeddings.len()
                )));
            }

            for ((idx, text), embedding) in
                uncached_indices.into_iter().zip(uncached_texts).zip(embeddings)
            {
                self.save_cached(&text, &embedding)?;
                results[idx] = Some(embedding);
            }
        }

        Ok(results.into_iter().map(|e| e.unwrap_or_default()).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
