//! Semantic Search Worker
//!
//! Runs the embedding model and vector index of `semsearch-core` behind a
//! message-driven worker. Callers post `embed` and `search` requests and
//! receive status events; the binary speaks the same protocol as
//! newline-delimited JSON over stdio.

pub mod error;
pub mod presentation;
pub mod protocol;
pub mod report;
pub mod transport;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{WorkerError, WorkerResult};
pub use presentation::{Column, GridRow, ProgressItem, SearchView};
pub use protocol::{SearchOutput, WorkerEvent, WorkerRequest};
pub use report::{FileReportSource, RecordLinker, ReportData, ReportSource};
pub use worker::{SearchWorker, WorkerConfig, WorkerHandle, WorkerState};
