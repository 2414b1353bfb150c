//! Worker Protocol Types
//!
//! Messages exchanged between a caller and the search worker. Both directions
//! are JSON objects discriminated by a single tag field (`action` inbound,
//! `status` outbound).

use semsearch_core::{ProgressEvent, ReportRow, SearchResult};
use serde::{Deserialize, Serialize};

/// Caller → worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WorkerRequest {
    /// Embed a report's rows and rebuild the index
    Embed {
        #[serde(default)]
        data: Vec<ReportRow>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header: Option<String>,
    },
    /// Search the current index with free text
    Search {
        #[serde(default)]
        data: String,
    },
}

impl WorkerRequest {
    pub fn embed(data: Vec<ReportRow>, header: impl Into<String>) -> Self {
        Self::Embed {
            data,
            header: Some(header.into()),
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self::Search { data: query.into() }
    }

    /// Action name as it appears on the wire
    pub fn action(&self) -> &'static str {
        match self {
            Self::Embed { .. } => "embed",
            Self::Search { .. } => "search",
        }
    }
}

/// Search results payload of a `complete` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutput {
    pub neighbors: SearchResult,
}

/// Worker → caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerEvent {
    /// A model artifact started loading
    Initiate { file: String },
    /// Load progress for one artifact, percent in [0, 100]
    Progress { file: String, progress: f32 },
    /// A model artifact finished loading
    Done { file: String },
    /// Model and index are available
    Ready,
    /// Search results
    Complete { output: SearchOutput },
    /// Terminal failure of the current request
    Error { text: String },
}

impl WorkerEvent {
    pub fn complete(neighbors: SearchResult) -> Self {
        Self::Complete {
            output: SearchOutput { neighbors },
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { text: text.into() }
    }

    /// Status discriminator as it appears on the wire
    pub fn status(&self) -> &'static str {
        match self {
            Self::Initiate { .. } => "initiate",
            Self::Progress { .. } => "progress",
            Self::Done { .. } => "done",
            Self::Ready => "ready",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }
}

impl From<ProgressEvent> for WorkerEvent {
    fn from(event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::Initiate { file } => Self::Initiate { file },
            ProgressEvent::Progress { file, progress } => Self::Progress { file, progress },
            ProgressEvent::Done { file } => Self::Done { file },
        }
    }
}
