//! Search worker
//!
//! An isolated tokio task that owns the model provider and the vector index.
//! Requests are queued on a single-consumer channel and processed strictly in
//! arrival order; every outcome, including failures, is reported as a
//! `WorkerEvent`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use semsearch_core::{
    encode, EmbedderHandle, IndexConfig, ModelProvider, ProgressCallback, ProgressEvent,
    ReportRow, VectorIndex,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{WorkerError, WorkerResult};
use crate::protocol::{WorkerEvent, WorkerRequest};

/// Neighbors returned per interactive query
pub const DEFAULT_TOP_K: usize = 5;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Neighbors per search (default: 5)
    pub top_k: usize,
    /// Limit on each phase of a request: model wait, encode/build, query
    pub request_timeout: Option<Duration>,
    /// Index build parameters
    pub index: IndexConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            request_timeout: None,
            index: IndexConfig::default(),
        }
    }
}

/// Lifecycle of the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    ModelLoading,
    ModelReady,
    Embedding,
    IndexReady,
    Searching,
    ResultsReady,
    /// Model acquisition failed; no request needing the model can succeed
    Failed,
}

/// Stream of outbound events
pub type WorkerEvents = mpsc::UnboundedReceiver<WorkerEvent>;

/// Caller side of a running worker
pub struct WorkerHandle {
    requests: Option<mpsc::UnboundedSender<WorkerRequest>>,
    state: watch::Receiver<WorkerState>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queue a request (fire-and-forget)
    pub fn post(&self, request: WorkerRequest) -> WorkerResult<()> {
        let sender = self.requests.as_ref().ok_or(WorkerError::Closed)?;
        sender.send(request).map_err(|_| WorkerError::Closed)
    }

    /// Current worker state
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    /// Stop accepting requests; queued ones still run
    pub fn close(&mut self) {
        self.requests = None;
    }

    /// Close and wait until every queued request has been processed
    pub async fn shutdown(mut self) {
        self.close();
        if let Err(e) = self.task.await {
            tracing::error!("Search worker task failed: {}", e);
        }
    }
}

/// Spawns search workers
pub struct SearchWorker;

impl SearchWorker {
    /// Start a worker on the current tokio runtime
    pub fn spawn(provider: Arc<ModelProvider>, config: WorkerConfig) -> (WorkerHandle, WorkerEvents) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);

        let context = WorkerContext {
            provider,
            index: None,
            config,
            events: event_tx,
            state: state_tx,
        };
        let task = tokio::spawn(context.run(request_rx));

        (
            WorkerHandle {
                requests: Some(request_tx),
                state: state_rx,
                task,
            },
            event_rx,
        )
    }
}

/// State owned by the worker task
struct WorkerContext {
    provider: Arc<ModelProvider>,
    index: Option<VectorIndex>,
    config: WorkerConfig,
    events: mpsc::UnboundedSender<WorkerEvent>,
    state: watch::Sender<WorkerState>,
}

impl WorkerContext {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<WorkerRequest>) {
        tracing::info!("Search worker started");

        while let Some(request) = requests.recv().await {
            self.handle(request).await;
        }

        tracing::info!("Search worker stopped");
    }

    async fn handle(&mut self, request: WorkerRequest) {
        tracing::debug!("Handling request: {}", request.action());

        let outcome = match request {
            WorkerRequest::Embed { data, header } => {
                self.embed(data, header.unwrap_or_default()).await
            }
            WorkerRequest::Search { data } => self.search(&data).await,
        };

        if let Err(e) = outcome {
            tracing::warn!("Request failed: {}", e);
            self.set_state(self.resting_state());
            self.emit(WorkerEvent::error(e.to_string()));
        }
    }

    /// Load the model (if needed), encode the rows and replace the index
    async fn embed(&mut self, rows: Vec<ReportRow>, header: String) -> WorkerResult<()> {
        let handle = self.model().await?;

        self.set_state(WorkerState::Embedding);
        // The previous report's index and cached vectors are gone whether or
        // not this build succeeds
        self.index = None;
        handle.clear_cache();

        tracing::info!("Embedding {} rows (header: {:?})", rows.len(), header);
        let index_config = self.config.index.clone();
        let index = with_timeout(self.config.request_timeout, async {
            let records = encode(&rows, &header, &handle).await?;
            let index = VectorIndex::build(records, &index_config)?;
            Ok::<_, WorkerError>(index)
        })
        .await?;

        tracing::info!("Index ready with {} records", index.len());
        self.index = Some(index);
        self.set_state(WorkerState::IndexReady);
        self.emit(WorkerEvent::Ready);
        Ok(())
    }

    /// Embed the query and search the current index
    async fn search(&mut self, query: &str) -> WorkerResult<()> {
        let (Some(index), Some(handle)) = (self.index.as_ref(), self.provider.get()) else {
            return Err(WorkerError::IndexUnavailable);
        };

        self.set_state(WorkerState::Searching);

        let top_k = self.config.top_k;
        let neighbors = with_timeout(self.config.request_timeout, async {
            let vector = handle.embed_query(query).await?;
            let neighbors = index.search(&vector, top_k)?;
            Ok::<_, WorkerError>(neighbors)
        })
        .await?;

        tracing::debug!("Search returned {} neighbors", neighbors.len());
        self.set_state(WorkerState::ResultsReady);
        self.emit(WorkerEvent::complete(neighbors));
        Ok(())
    }

    async fn model(&self) -> WorkerResult<EmbedderHandle> {
        if let Some(handle) = self.provider.get() {
            return Ok(handle);
        }

        self.set_state(WorkerState::ModelLoading);
        let events = self.events.clone();
        let progress: ProgressCallback = Arc::new(move |event: ProgressEvent| {
            let _ = events.send(WorkerEvent::from(event));
        });

        // A timed-out wait leaves the load running for the next request
        let handle = with_timeout(self.config.request_timeout, async {
            Ok::<_, WorkerError>(self.provider.get_instance(progress).await?)
        })
        .await?;
        self.set_state(WorkerState::ModelReady);
        Ok(handle)
    }

    /// State to settle in after a failed request
    fn resting_state(&self) -> WorkerState {
        if self.provider.is_settled() && self.provider.get().is_none() {
            WorkerState::Failed
        } else if self.provider.is_loading() {
            WorkerState::ModelLoading
        } else if self.index.is_some() {
            WorkerState::IndexReady
        } else if self.provider.get().is_some() {
            WorkerState::ModelReady
        } else {
            WorkerState::Idle
        }
    }

    fn set_state(&self, state: WorkerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("Worker state: {:?} -> {:?}", previous, state);
        }
    }

    fn emit(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = WorkerResult<T>>,
) -> WorkerResult<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| WorkerError::Timeout(limit))?,
        None => fut.await,
    }
}
