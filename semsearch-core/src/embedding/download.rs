//! Model artifact download
//!
//! Fetches the model files from the HuggingFace hub into the cache directory
//! on first use. Each file is its own progress stream.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::discovery::{find_models_dir, repo_dir_name};
use crate::error::{Result, SearchError};
use crate::progress::ProgressTracker;

pub const HF_BASE_URL: &str = "https://huggingface.co";
pub const DEFAULT_MODEL_REPO: &str = "Xenova/all-MiniLM-L6-v2";
pub const MODEL_FILES: &[&str] = &[
    "config.json",
    "tokenizer.json",
    "tokenizer_config.json",
    "special_tokens_map.json",
    "onnx/model.onnx",
];

const CHUNK_SIZE: usize = 64 * 1024;

/// Where to fetch the embedding model from and where to keep it
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Hub repository (default: Xenova/all-MiniLM-L6-v2)
    pub repo: String,
    /// Hub base URL
    pub base_url: String,
    /// Branch, tag or commit
    pub revision: String,
    /// Artifacts to fetch, relative to the repository root
    pub files: Vec<String>,
    /// Cache root override
    pub cache_dir: Option<PathBuf>,
    /// Maximum tokens per input (default: 256)
    pub max_length: usize,
    /// Connection timeout (default: 30s)
    pub connect_timeout: Duration,
    /// Limit on a single stalled read (default: 60s)
    pub read_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo: DEFAULT_MODEL_REPO.to_string(),
            base_url: HF_BASE_URL.to_string(),
            revision: "main".to_string(),
            files: MODEL_FILES.iter().map(|f| f.to_string()).collect(),
            cache_dir: None,
            max_length: 256,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }
}

impl ModelConfig {
    /// Local directory holding this model's artifacts
    pub fn model_dir(&self) -> Result<PathBuf> {
        Ok(find_models_dir(self.cache_dir.as_deref())?.join(repo_dir_name(&self.repo)))
    }

    fn file_url(&self, file: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.repo,
            self.revision,
            file
        )
    }
}

/// Make sure every configured artifact is in the cache, downloading what is missing
///
/// Returns the model directory.
pub fn ensure_model_files(config: &ModelConfig, tracker: &ProgressTracker) -> Result<PathBuf> {
    let model_dir = config.model_dir()?;
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(config.connect_timeout)
        .timeout_read(config.read_timeout)
        .build();

    for file in &config.files {
        let dest = model_dir.join(file);
        tracker.initiate(file);

        if dest.exists() {
            log::debug!("{} already cached at {}", file, dest.display());
            tracker.done(file);
            continue;
        }

        download_file(&agent, &config.file_url(file), &dest, file, tracker)?;
        tracker.done(file);
    }

    Ok(model_dir)
}

fn download_file(
    agent: &ureq::Agent,
    url: &str,
    dest: &Path,
    file: &str,
    tracker: &ProgressTracker,
) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| SearchError::invalid_path(dest.display().to_string()))?;
    fs::create_dir_all(parent)?;

    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SearchError::invalid_path(dest.display().to_string()))?;
    let partial = dest.with_file_name(format!("{}.part", file_name));

    log::info!("Downloading {} from {}", file, url);

    let result = stream_to(agent, url, &partial, file, tracker);
    if let Err(e) = result {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    fs::rename(&partial, dest)?;
    Ok(())
}

fn stream_to(
    agent: &ureq::Agent,
    url: &str,
    partial: &Path,
    file: &str,
    tracker: &ProgressTracker,
) -> Result<()> {
    let response = agent
        .get(url)
        .call()
        .map_err(|e| SearchError::download(format!("Failed to download {}: {}", file, e)))?;

    let total = response
        .header("Content-Length")
        .and_then(|v| v.parse::<u64>().ok());

    let mut reader = response.into_reader();
    let mut out = fs::File::create(partial)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut loaded: u64 = 0;

    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| SearchError::download(format!("Failed to read {}: {}", file, e)))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        loaded += n as u64;
        if let Some(total) = total {
            tracker.update(file, loaded, total);
        }
    }
    out.flush()?;

    if let Some(total) = total {
        if loaded != total {
            return Err(SearchError::download(format!(
                "{}: expected {} bytes, received {}",
                file, total, loaded
            )));
        }
    }

    let size_mb = loaded as f64 / (1024.0 * 1024.0);
    log::info!("  {}: {:.1} MB", file, size_mb);
    Ok(())
}
