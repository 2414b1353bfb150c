//! Model load progress streams
//!
//! Every model artifact is one stream identified by its file path:
//! `initiate`, zero or more `progress` updates, then `done`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A single progress update for one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressEvent {
    Initiate { file: String },
    Progress { file: String, progress: f32 },
    Done { file: String },
}

impl ProgressEvent {
    /// Artifact this event belongs to
    pub fn file(&self) -> &str {
        match self {
            Self::Initiate { file } | Self::Progress { file, .. } | Self::Done { file } => file,
        }
    }
}

/// Receiver of progress events
///
/// May be called from the blocking thread that performs the download.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Callback that drops every event
pub fn ignore_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

#[derive(Debug, Default)]
struct StreamState {
    percent: Option<f32>,
    done: bool,
}

/// Enforces the per-file stream shape before forwarding to a callback
///
/// Duplicate `initiate`s, updates for unknown or finished files and
/// non-increasing percentages are dropped, so observers always see
/// `initiate`, non-decreasing `progress` in [0, 100], and exactly one `done`.
pub struct ProgressTracker {
    callback: ProgressCallback,
    streams: Mutex<HashMap<String, StreamState>>,
}

impl ProgressTracker {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Start a stream for `file`
    pub fn initiate(&self, file: &str) {
        {
            let mut streams = self.streams.lock();
            if streams.contains_key(file) {
                return;
            }
            streams.insert(file.to_string(), StreamState::default());
        }
        (self.callback)(ProgressEvent::Initiate {
            file: file.to_string(),
        });
    }

    /// Report `loaded` of `total` bytes
    ///
    /// Emits only when the whole-number percentage grows.
    pub fn update(&self, file: &str, loaded: u64, total: u64) {
        if total == 0 {
            return;
        }
        let percent = ((loaded as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32;

        {
            let mut streams = self.streams.lock();
            let Some(state) = streams.get_mut(file) else {
                return;
            };
            if state.done {
                return;
            }
            if let Some(last) = state.percent {
                if percent.floor() <= last.floor() {
                    return;
                }
            }
            state.percent = Some(percent);
        }
        (self.callback)(ProgressEvent::Progress {
            file: file.to_string(),
            progress: percent,
        });
    }

    /// Finish the stream for `file`
    pub fn done(&self, file: &str) {
        {
            let mut streams = self.streams.lock();
            match streams.get_mut(file) {
                Some(state) if !state.done => state.done = true,
                _ => return,
            }
        }
        (self.callback)(ProgressEvent::Done {
            file: file.to_string(),
        });
    }

    /// Files initiated but not yet done
    pub fn in_flight(&self) -> Vec<String> {
        let streams = self.streams.lock();
        let mut files: Vec<String> = streams
            .iter()
            .filter(|(_, s)| !s.done)
            .map(|(f, _)| f.clone())
            .collect();
        files.sort();
        files
    }
}
