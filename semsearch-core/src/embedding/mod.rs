//! Embedding module for semantic search
//!
//! Uses all-MiniLM-L6-v2 (384d, mean pooling) through fastembed by default.

mod discovery;
mod download;
mod engine;
mod model;
mod provider;

pub use discovery::{find_models_dir, MODELS_PATH_ENV};
pub use download::{ensure_model_files, ModelConfig, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use engine::{l2_normalize, EmbedderHandle};
pub use model::{FastEmbedModel, HubModelLoader, ModelLoader, TextEmbedder};
pub use provider::ModelProvider;
