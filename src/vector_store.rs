//! Append-only flat vector store with parallel metadata.
//!
//! Vectors and metadata records are kept in two parallel lists: position `i`
//! in one corresponds exactly to position `i` in the other, and both are
//! persisted together on every add. Search is exact squared-Euclidean over
//! the whole store.

use crate::error::{Result, YtqaError};
use crate::models::{ChunkMetadata, ScoredChunk};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File-backed flat similarity index.
pub struct FlatVectorStore {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<ChunkMetadata>,
    index_path: PathBuf,
    metadata_path: PathBuf,
}

impl FlatVectorStore {
    /// Open the store in `cache_dir`, loading any persisted state.
    pub fn new(dimension: usize, cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        std::fs::create_dir_all(cache_dir)?;

        let mut store = Self {
            dimension,
            vectors: Vec::new(),
            metadata: Vec::new(),
            index_path: cache_dir.join("index.json"),
            metadata_path: cache_dir.join("metadata.json"),
        };
        store.load()?;
        Ok(store)
    }

    fn load(&mut self) -> Result<()> {
        if !self.index_path.exists() || !self.metadata_path.exists() {
            return Ok(());
        }

        let vectors: Vec<Vec<f32>> =
            serde_json::from_str(&std::fs::read_to_string(&self.index_path)?)?;
        let metadata: Vec<ChunkMetadata> =
            serde_json::from_str(&std::fs::read_to_string(&self.metadata_path)?)?;

        // A crash between the two writes can desynchronize the files; start
        // empty rather than serving mismatched positions.
        if vectors.len() != metadata.len() {
            warn!(
                "Index/metadata length mismatch ({} vs {}), ignoring persisted store",
                vectors.len(),
                metadata.len()
            );
            return Ok(());
        }

        info!("Loaded {} vectors from cache", vectors.len());
        self.vectors = vectors;
        self.metadata = metadata;
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        std::fs::write(&self.index_path, serde_json::to_string(&self.vectors)?)?;
        std::fs::write(&self.metadata_path, serde_json::to_string(&self.metadata)?)?;
        Ok(())
    }

    /// Whether any vectors for a video id are present.
    pub fn contains_video(&self, video_id: &str) -> bool {
        self.metadata.iter().any(|m| m.video_id == video_id)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append vectors with their metadata and persist both files.
    ///
    /// The batch must carry exactly one video id; a batch for a video already
    /// in the store is a silent no-op so a processed video is never indexed
    /// twice.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, metadata: Vec<ChunkMetadata>) -> Result<()> {
        if vectors.len() != metadata.len() {
            return Err(YtqaError::InputMismatch(format!(
                "{} vectors but {} metadata records",
                vectors.len(),
                metadata.len()
            )));
        }

        if vectors.is_empty() {
            return Ok(());
        }

        let video_id = metadata[0].video_id.clone();
        if metadata.iter().any(|m| m.video_id != video_id) {
            return Err(YtqaError::InputMismatch(
                "add batch mixes multiple video ids".to_string(),
            ));
        }

        if let Some(v) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(YtqaError::InputMismatch(format!(
                "vector of dimension {} in a {}-dimensional store",
                v.len(),
                self.dimension
            )));
        }

        if self.contains_video(&video_id) {
            info!("Vectors for video {} already exist, skipping", video_id);
            return Ok(());
        }

        info!("Adding {} vectors to the store", vectors.len());
        self.vectors.extend(vectors);
        self.metadata.extend(metadata);
        self.persist()
    }

    /// Nearest neighbors of `query`, ascending by squared Euclidean distance.
    ///
    /// Returns fewer than `k` results if the store holds fewer vectors, and an
    /// empty list on an empty store.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(YtqaError::InputMismatch(format!(
                "query of dimension {} in a {}-dimensional store",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (squared_l2(query, v), i))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| ScoredChunk {
                metadata: self.metadata[i].clone(),
                distance,
            })
            .collect())
    }

    /// Defensive copy of all stored metadata in insertion order.
    pub fn get_all_metadata(&self) -> Vec<ChunkMetadata> {
        self.metadata.clone()
    }

    /// Reset the store and remove persisted files.
    pub fn clear(&mut self) -> Result<()> {
        self.vectors.clear();
        self.metadata.clear();
        for path in [&self.index_path, &self.metadata_path] {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(video_id: &str, text: &str, chunk_index: usize) -> ChunkMetadata {
        ChunkMetadata {
            video_id: video_id.to_string(),
            text: text.to_string(),
            start: chunk_index as f64 * 60.0,
            duration: 60.0,
            chunk_index,
        }
    }

    #[test]
    fn test_add_then_search_nearest_self() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FlatVectorStore::new(3, tmp.path()).unwrap();

        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let metadata = vec![meta("v1", "first", 0), meta("v1", "second", 1)];
        store.add(vectors, metadata).unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.text, "first");
        assert!(results[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_add_rejects_length_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FlatVectorStore::new(3, tmp.path()).unwrap();

        let err = store
            .add(vec![vec![1.0, 0.0, 0.0]], vec![])
            .unwrap_err();
        assert!(matches!(err, YtqaError::InputMismatch(_)));
    }

    #[test]
    fn test_add_rejects_mixed_video_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FlatVectorStore::new(3, tmp.path()).unwrap();

        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let metadata = vec![meta("v1", "a", 0), meta("v2", "b", 0)];
        let err = store.add(vectors, metadata).unwrap_err();
        assert!(matches!(err, YtqaError::InputMismatch(_)));
    }

    #[test]
    fn test_duplicate_video_add_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FlatVectorStore::new(3, tmp.path()).unwrap();

        store
            .add(vec![vec![1.0, 0.0, 0.0]], vec![meta("v1", "a", 0)])
            .unwrap();
        assert_eq!(store.len(), 1);

        store
            .add(vec![vec![0.0, 1.0, 0.0]], vec![meta("v1", "b", 1)])
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_search_empty_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FlatVectorStore::new(3, tmp.path()).unwrap();
        assert!(store.search(&[0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_returns_fewer_than_k() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FlatVectorStore::new(3, tmp.path()).unwrap();

        store
            .add(vec![vec![1.0, 0.0, 0.0]], vec![meta("v1", "a", 0)])
            .unwrap();
        assert_eq!(store.search(&[1.0, 0.0, 0.0], 10).unwrap().len(), 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut store = FlatVectorStore::new(3, tmp.path()).unwrap();
            store
                .add(vec![vec![1.0, 2.0, 3.0]], vec![meta("v1", "a", 0)])
                .unwrap();
        }

        let reloaded = FlatVectorStore::new(3, tmp.path()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get_all_metadata()[0].text, "a");
    }

    #[test]
    fn test_clear_removes_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FlatVectorStore::new(3, tmp.path()).unwrap();

        store
            .add(vec![vec![1.0, 0.0, 0.0]], vec![meta("v1", "a", 0)])
            .unwrap();
        store.clear().unwrap();

        assert!(store.is_empty());
        assert!(!tmp.path().join("index.json").exists());
        assert!(!tmp.path().join("metadata.json").exists());
    }
}
