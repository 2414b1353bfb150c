//! Semantic Search Worker Entry Point
//!
//! Two modes:
//! - Serve (default): worker protocol as newline-delimited JSON over stdio
//! - One-shot (--reports-dir): list reports, or index one and run a query

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use semsearch_core::{IndexConfig, ModelConfig, ModelProvider};
use semsearch_worker::report::DEFAULT_REPORT_LIMIT;
use semsearch_worker::worker::WorkerEvents;
use semsearch_worker::{
    transport, FileReportSource, RecordLinker, ReportSource, SearchView, SearchWorker,
    WorkerConfig, WorkerError, WorkerEvent, WorkerResult,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "semsearch-worker")]
#[command(about = "Semantic search over tabular reports")]
#[command(version)]
struct Args {
    /// Model cache directory
    #[arg(long, env = "SEMSEARCH_MODELS_PATH")]
    models_dir: Option<PathBuf>,

    /// Neighbors returned per query
    #[arg(long, default_value = "5")]
    top_k: NonZeroUsize,

    /// Limit for encoding and searching, per request
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Record count at which the index switches to an HNSW graph
    #[arg(long)]
    hnsw_threshold: Option<usize>,

    /// Directory of `<report_id>.json` files (enables one-shot mode)
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Report to index; lists reports when omitted
    #[arg(long, requires = "reports_dir")]
    report: Option<String>,

    /// Query to run against the indexed report
    #[arg(long, requires = "report")]
    query: Option<String>,

    /// Report name filter for listing
    #[arg(long)]
    name: Option<String>,

    /// Application base URL for record links
    #[arg(long, env = "SEMSEARCH_BASE_URL")]
    base_url: Option<String>,
}

impl Args {
    fn worker_config(&self) -> WorkerConfig {
        let mut index = IndexConfig::default();
        if let Some(threshold) = self.hnsw_threshold {
            index.hnsw_threshold = threshold;
        }

        WorkerConfig {
            top_k: self.top_k.get(),
            request_timeout: self.timeout_secs.map(Duration::from_secs),
            index,
        }
    }

    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            cache_dir: self.models_dir.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "semsearch_worker=info,semsearch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &args.reports_dir {
        Some(dir) => run_once(&args, FileReportSource::new(dir)).await,
        None => serve(&args).await,
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn serve(args: &Args) -> WorkerResult<()> {
    tracing::info!("Starting semantic search worker on stdio");

    let provider = Arc::new(ModelProvider::hub(args.model_config()));
    let (handle, events) = SearchWorker::spawn(provider, args.worker_config());
    let (mut reader, mut writer) = transport::stdio();

    transport::serve(&mut reader, &mut writer, handle, events).await
}

async fn run_once(args: &Args, source: FileReportSource) -> WorkerResult<()> {
    let Some(report_id) = &args.report else {
        return list_reports(args, &source);
    };

    let report = source.report_data(report_id, 0, DEFAULT_REPORT_LIMIT)?;
    tracing::info!(
        "Loaded report {} ({} rows, text field {:?})",
        report_id,
        report.data.len(),
        report.text_field()
    );

    let provider = Arc::new(ModelProvider::hub(args.model_config()));
    let (handle, mut events) = SearchWorker::spawn(provider, args.worker_config());
    let mut view = SearchView::new(report);

    handle.post(view.embed_request())?;
    await_settled(&mut view, &mut events).await?;

    if let Some(request) = args.query.as_deref().and_then(|q| view.submit_query(q)) {
        handle.post(request)?;
        await_settled(&mut view, &mut events).await?;
    }

    print_rows(&view, args.base_url.as_deref().map(RecordLinker::new));
    handle.shutdown().await;
    Ok(())
}

/// Feed events into the view until the current request finishes
async fn await_settled(view: &mut SearchView, events: &mut WorkerEvents) -> WorkerResult<()> {
    while let Some(event) = events.recv().await {
        view.apply(&event);
        match event {
            WorkerEvent::Progress { .. } => {
                for item in view.progress_items() {
                    tracing::info!("{}", item.label());
                }
            }
            WorkerEvent::Ready | WorkerEvent::Complete { .. } => return Ok(()),
            WorkerEvent::Error { text } => return Err(WorkerError::RequestFailed(text)),
            WorkerEvent::Initiate { .. } | WorkerEvent::Done { .. } => {}
        }
    }
    Err(WorkerError::Closed)
}

fn print_rows(view: &SearchView, linker: Option<RecordLinker>) {
    let columns = view.columns();
    let text_field = columns
        .get(1)
        .map(|c| c.field.as_str())
        .unwrap_or("title");

    for row in view.rows() {
        let value = serde_json::to_value(&row).unwrap_or_default();
        let text = value
            .get(text_field)
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        let distance = value
            .get("distance")
            .and_then(|d| d.as_f64())
            .map(|d| format!("{:.4}\t", d))
            .unwrap_or_default();

        match &linker {
            Some(linker) => println!(
                "{}\t{}{}\t{}",
                row.row_id(),
                distance,
                text,
                view.record_link(linker, &row)
            ),
            None => println!("{}\t{}{}", row.row_id(), distance, text),
        }
    }
}

fn list_reports(args: &Args, source: &FileReportSource) -> WorkerResult<()> {
    let mut filters = HashMap::new();
    if let Some(name) = &args.name {
        filters.insert("name".to_string(), name.clone());
    }

    let list = source.query_list(0, usize::MAX, &filters)?;
    tracing::info!("{} reports in {}", list.total_count, source.dir().display());
    for report in list.data {
        println!("{}\t{}", report.report_id, report.name);
    }
    Ok(())
}
