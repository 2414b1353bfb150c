//! Embedding model backends
//!
//! `TextEmbedder` is the seam between the engine and an actual model.
//! `FastEmbedModel` runs an ONNX sentence-transformer through fastembed with
//! mean pooling; `HubModelLoader` fetches its artifacts first.

use fastembed::{
    InitOptionsUserDefined, Pooling, TextEmbedding, TokenizerFiles, UserDefinedEmbeddingModel,
};
use std::path::Path;
use std::sync::Arc;

use super::download::{ensure_model_files, ModelConfig};
use crate::error::{Result, SearchError};
use crate::progress::ProgressTracker;

/// A text embedding model
///
/// Implementations are synchronous and may be CPU-heavy; callers run them on
/// blocking threads.
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts, one vector per input in input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Output vector dimension
    fn dimension(&self) -> usize;

    /// Model identifier
    fn model_name(&self) -> &str;
}

/// Acquires a model, reporting per-artifact progress
pub trait ModelLoader: Send + Sync {
    fn load(&self, progress: &ProgressTracker) -> Result<Arc<dyn TextEmbedder>>;
}

/// fastembed model loaded from local ONNX + tokenizer files
pub struct FastEmbedModel {
    model: TextEmbedding,
    name: String,
    dimension: usize,
}

impl FastEmbedModel {
    /// Load from a directory laid out like a hub repository
    ///
    /// Required files:
    /// - onnx/model.onnx
    /// - tokenizer.json, tokenizer_config.json, special_tokens_map.json
    /// - config.json
    pub fn from_dir(model_dir: &Path, name: &str, max_length: usize) -> Result<Self> {
        let read = |file: &str| {
            std::fs::read(model_dir.join(file))
                .map_err(|e| SearchError::model(format!("Failed to read {}: {}", file, e)))
        };

        log::info!("Loading {} from: {}", name, model_dir.display());

        let tokenizer_files = TokenizerFiles {
            tokenizer_file: read("tokenizer.json")?,
            config_file: read("config.json")?,
            special_tokens_map_file: read("special_tokens_map.json")?,
            tokenizer_config_file: read("tokenizer_config.json")?,
        };

        let user_model = UserDefinedEmbeddingModel::new(read("onnx/model.onnx")?, tokenizer_files)
            .with_pooling(Pooling::Mean);
        let options = InitOptionsUserDefined::new().with_max_length(max_length);

        let model = TextEmbedding::try_new_from_user_defined(user_model, options)
            .map_err(|e| SearchError::model(format!("Failed to initialize {}: {}", name, e)))?;

        // Get dimension by encoding test string
        let probe = model
            .embed(vec!["test"], None)
            .map_err(|e| SearchError::model(format!("Failed to encode test string: {}", e)))?;
        let dimension = probe
            .first()
            .map(Vec::len)
            .ok_or_else(|| SearchError::model("model returned no embeddings"))?;

        log::info!("Loaded {} ({}d, max {} tokens)", name, dimension, max_length);

        Ok(Self {
            model,
            name: name.to_string(),
            dimension,
        })
    }
}

impl TextEmbedder for FastEmbedModel {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| SearchError::embedding(format!("Failed to encode texts: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Downloads the configured hub model (if needed) and loads it with fastembed
pub struct HubModelLoader {
    config: ModelConfig,
}

impl HubModelLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl ModelLoader for HubModelLoader {
    fn load(&self, progress: &ProgressTracker) -> Result<Arc<dyn TextEmbedder>> {
        let model_dir = ensure_model_files(&self.config, progress)?;
        let model = FastEmbedModel::from_dir(&model_dir, &self.config.repo, self.config.max_length)?;
        Ok(Arc::new(model))
    }
}
