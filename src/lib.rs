//! ytqa - YouTube transcript retrieval, indexing, and question answering.
//!
//! Retrieves transcripts for YouTube videos (native captions with a
//! speech-to-text fallback), merges them into minute-scale chunks, indexes
//! them in a local vector store, and answers questions over the indexed
//! content.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `cache` - Disk cache for transcripts, topics, and audio artifacts
//! - `transcript` - Caption/audio providers and the fallback factory
//! - `merge` - Segment merging into target-duration chunks
//! - `embedding` - Embedding generation with content-addressed caching
//! - `vector_store` - Flat similarity index with parallel metadata
//! - `topics` - Topic segmentation into chapter blocks
//! - `qa` - Answer generation over retrieved chunks
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use ytqa::config::Settings;
//! use ytqa::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut orchestrator = Orchestrator::new(&settings)?;
//!
//!     let summary = orchestrator
//!         .process_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!         .await?;
//!     println!("Indexed {} chunks", summary.chunks.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod merge;
pub mod models;
pub mod openai;
pub mod orchestrator;
pub mod qa;
pub mod topics;
pub mod transcript;
pub mod vector_store;

pub use error::{Result, YtqaError};
