//! Report semantic search core
//!
//! Embedding and nearest-neighbor search over the rows of a tabular report.
//!
//! ## Features
//!
//! - **Lazy model provider** - all-MiniLM-L6-v2 fetched from the hub on first use, with per-file progress
//! - **Batch encoder** - all-or-nothing encoding of report rows into unit-length vectors
//! - **Vector index** - exact cosine k-NN, with an HNSW candidate stage for very large reports
//!
//! ## Example
//!
//! ```ignore
//! use semsearch_core::{encode, ignore_progress, IndexConfig, ModelConfig, ModelProvider, VectorIndex};
//!
//! let provider = ModelProvider::hub(ModelConfig::default());
//! let handle = provider.get_instance(ignore_progress()).await?;
//!
//! let records = encode(&rows, "text", &handle).await?;
//! let index = VectorIndex::build(records, &IndexConfig::default())?;
//!
//! let query = handle.embed_query("fruit").await?;
//! let neighbors = index.search(&query, 5)?;
//! ```

pub mod embedding;
pub mod encoder;
pub mod error;
pub mod index;
pub mod progress;
pub mod record;

// Re-exports for convenience
pub use embedding::{EmbedderHandle, ModelConfig, ModelLoader, ModelProvider, TextEmbedder};
pub use encoder::{encode, encode_blocking};
pub use error::{Result, SearchError};
pub use index::{IndexConfig, Neighbor, SearchResult, VectorIndex};
pub use progress::{ignore_progress, ProgressCallback, ProgressEvent, ProgressTracker};
pub use record::{EmbeddingRecord, RecordId, ReportRow};
