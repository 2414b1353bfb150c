//! Model cache directory discovery
//!
//! Finds where downloaded model artifacts live across installation scenarios.

use crate::error::{Result, SearchError};
use std::path::{Path, PathBuf};

/// Environment variable overriding the model cache root
pub const MODELS_PATH_ENV: &str = "SEMSEARCH_MODELS_PATH";

/// Find the model cache root with priority:
/// 1. Explicit path (CLI flag / config)
/// 2. SEMSEARCH_MODELS_PATH environment variable
/// 3. User home directory (~/.semsearch/models)
///
/// The directory does not need to exist yet; downloads create it.
pub fn find_models_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: explicit
    if let Some(path) = explicit {
        log::debug!("Using explicit models path: {}", path.display());
        return Ok(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Some(path) = std::env::var_os(MODELS_PATH_ENV) {
        if !path.is_empty() {
            let path = PathBuf::from(path);
            log::debug!("Using {}: {}", MODELS_PATH_ENV, path.display());
            return Ok(path);
        }
    }

    // Priority 3: user home directory
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return Ok(PathBuf::from(home).join(".semsearch").join("models"));
    }

    Err(SearchError::invalid_path(format!(
        "Cannot determine model cache directory. Set {} or pass an explicit path.",
        MODELS_PATH_ENV
    )))
}

/// Directory name for a hub repository inside the cache root
pub fn repo_dir_name(repo: &str) -> String {
    repo.replace('/', "--")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = find_models_dir(Some(Path::new("/opt/models"))).unwrap();
        assert_eq!(dir, PathBuf::from("/opt/models"));
    }

    #[test]
    fn test_find_without_explicit_path() {
        // Either an env/home based path or an error when neither is set
        match find_models_dir(None) {
            Ok(path) => assert!(!path.as_os_str().is_empty()),
            Err(e) => assert!(e.to_string().contains("model cache directory")),
        }
    }

    #[test]
    fn test_repo_dir_name() {
        assert_eq!(
            repo_dir_name("Xenova/all-MiniLM-L6-v2"),
            "Xenova--all-MiniLM-L6-v2"
        );
    }
}
