//! Lazily acquired, shared embedding model
//!
//! The first `get_instance` call starts the load as a detached task; every
//! caller (including ones arriving while it runs) waits for that task's
//! outcome. A caller that stops waiting does not cancel the load. The
//! outcome, success or failure, is kept for the provider's lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::download::ModelConfig;
use super::engine::EmbedderHandle;
use super::model::{HubModelLoader, ModelLoader};
use crate::error::{Result, SearchError};
use crate::progress::{ProgressCallback, ProgressTracker};

type LoadOutcome = std::result::Result<EmbedderHandle, String>;

/// Owner of the single embedding model instance
pub struct ModelProvider {
    loader: Arc<dyn ModelLoader>,
    started: AtomicBool,
    outcome: Arc<watch::Sender<Option<LoadOutcome>>>,
}

impl ModelProvider {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            loader,
            started: AtomicBool::new(false),
            outcome: Arc::new(outcome),
        }
    }

    /// Provider backed by the HuggingFace hub
    pub fn hub(config: ModelConfig) -> Self {
        Self::new(Arc::new(HubModelLoader::new(config)))
    }

    /// Get the model, loading it on first use
    ///
    /// `progress` receives the load's progress streams; it is only used by the
    /// call that actually starts the load. Dropping the returned future leaves
    /// the load running.
    pub async fn get_instance(&self, progress: ProgressCallback) -> Result<EmbedderHandle> {
        let mut outcome = self.outcome.subscribe();

        if !self.started.swap(true, Ordering::SeqCst) {
            self.start_load(progress);
        }

        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .map_err(|_| SearchError::other("model loader stopped"))?;

        match settled.as_ref() {
            Some(Ok(handle)) => Ok(handle.clone()),
            Some(Err(e)) => Err(SearchError::Other(e.clone())),
            None => Err(SearchError::other("model loader stopped")),
        }
    }

    fn start_load(&self, progress: ProgressCallback) {
        let loader = Arc::clone(&self.loader);
        let outcome = Arc::clone(&self.outcome);
        log::info!("Acquiring embedding model");

        tokio::spawn(async move {
            let joined = tokio::task::spawn_blocking(move || {
                let tracker = ProgressTracker::new(progress);
                loader.load(&tracker).map(EmbedderHandle::new)
            })
            .await;

            let result = match joined {
                Ok(Ok(handle)) => {
                    log::info!(
                        "Embedding model ready ({}, {}d)",
                        handle.model_name(),
                        handle.dimension()
                    );
                    Ok(handle)
                }
                Ok(Err(e)) => {
                    log::error!("Embedding model acquisition failed: {}", e);
                    Err(e.to_string())
                }
                Err(e) => Err(format!("model loader task failed: {}", e)),
            };
            outcome.send_replace(Some(result));
        });
    }

    /// The loaded model, if a load has finished successfully
    pub fn get(&self) -> Option<EmbedderHandle> {
        match self.outcome.borrow().as_ref() {
            Some(Ok(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Whether a load has finished (successfully or not)
    pub fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Whether a load has started and not yet finished
    pub fn is_loading(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.is_settled()
    }
}
