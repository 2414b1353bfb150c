//! Result presentation
//!
//! `SearchView` folds worker events into what a search screen shows: the
//! model download progress, whether searching is allowed, and a grid that
//! holds either the report rows or the ranked results.

use semsearch_core::{Neighbor, RecordId, ReportRow};
use serde::Serialize;

use crate::protocol::{WorkerEvent, WorkerRequest};
use crate::report::{RecordLinker, ReportData};

/// How a grid cell is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// "Open" link to the source record
    Link,
    Text,
}

/// Grid column definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub field: String,
    pub header_name: &'static str,
    pub width: u32,
    pub sortable: bool,
    pub kind: CellKind,
}

fn columns_for(id_field: &str, text_field: &str) -> Vec<Column> {
    vec![
        Column {
            field: id_field.to_string(),
            header_name: "Record",
            width: 100,
            sortable: false,
            kind: CellKind::Link,
        },
        Column {
            field: text_field.to_string(),
            header_name: "Text",
            width: 950,
            sortable: true,
            kind: CellKind::Text,
        },
    ]
}

/// One grid row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GridRow {
    Report(ReportRow),
    Neighbor(Neighbor),
}

impl GridRow {
    /// Row identity: `id` for results, `record_id` for report rows
    pub fn row_id(&self) -> &RecordId {
        match self {
            Self::Report(row) => &row.record_id,
            Self::Neighbor(neighbor) => &neighbor.id,
        }
    }

    /// Value of the record id column
    pub fn record_id(&self) -> &RecordId {
        match self {
            Self::Report(row) => &row.record_id,
            Self::Neighbor(neighbor) => &neighbor.url,
        }
    }
}

/// A model artifact still loading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressItem {
    pub file: String,
    pub progress: Option<f32>,
}

impl ProgressItem {
    /// e.g. `onnx/model.onnx (42.50%)`
    pub fn label(&self) -> String {
        format!("{} ({:.2}%)", self.file, self.progress.unwrap_or(0.0))
    }
}

/// View state of the search screen for one report
#[derive(Debug, Clone, Default)]
pub struct SearchView {
    report: ReportData,
    results: Option<Vec<Neighbor>>,
    progress: Vec<ProgressItem>,
    ready: bool,
    error: Option<String>,
}

impl SearchView {
    pub fn new(report: ReportData) -> Self {
        Self {
            report,
            ..Default::default()
        }
    }

    /// Message that starts indexing the loaded report
    pub fn embed_request(&self) -> WorkerRequest {
        self.report.embed_request()
    }

    /// Fold one worker event into the view
    pub fn apply(&mut self, event: &WorkerEvent) {
        match event {
            WorkerEvent::Initiate { file } => {
                self.ready = false;
                if !self.progress.iter().any(|item| &item.file == file) {
                    self.progress.push(ProgressItem {
                        file: file.clone(),
                        progress: None,
                    });
                }
            }
            WorkerEvent::Progress { file, progress } => {
                if let Some(item) = self.progress.iter_mut().find(|item| &item.file == file) {
                    item.progress = Some(*progress);
                }
            }
            WorkerEvent::Done { file } => {
                self.progress.retain(|item| &item.file != file);
            }
            WorkerEvent::Ready => {
                self.ready = true;
                self.error = None;
            }
            WorkerEvent::Complete { output } => {
                self.ready = true;
                self.error = None;
                self.results = Some(output.neighbors.clone());
            }
            WorkerEvent::Error { text } => {
                self.ready = false;
                self.error = Some(text.clone());
            }
        }
    }

    /// Search request for `input`, or `None` when the query is empty
    ///
    /// An empty query restores the report rows instead of searching.
    pub fn submit_query(&mut self, input: &str) -> Option<WorkerRequest> {
        let query = input.trim();
        if query.is_empty() {
            self.results = None;
            return None;
        }

        self.ready = false;
        Some(WorkerRequest::search(query))
    }

    /// Whether the search trigger is enabled
    pub fn can_search(&self) -> bool {
        self.ready
    }

    /// Whether the "Loading AI Model..." banner is shown
    pub fn is_loading(&self) -> bool {
        !self.ready && !self.progress.is_empty()
    }

    pub fn progress_items(&self) -> &[ProgressItem] {
        &self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the grid shows search results rather than report rows
    pub fn showing_results(&self) -> bool {
        self.results.is_some()
    }

    pub fn columns(&self) -> Vec<Column> {
        match (&self.results, self.report.text_field()) {
            (None, Some(text_field)) if !self.report.data.is_empty() => {
                columns_for("record_id", text_field)
            }
            _ => columns_for("id", "title"),
        }
    }

    pub fn rows(&self) -> Vec<GridRow> {
        match &self.results {
            Some(neighbors) => neighbors.iter().cloned().map(GridRow::Neighbor).collect(),
            None => self.report.data.iter().cloned().map(GridRow::Report).collect(),
        }
    }

    /// Link for the record column of `row`
    pub fn record_link(&self, linker: &RecordLinker, row: &GridRow) -> String {
        linker.url(row.record_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportHeader;

    fn report() -> ReportData {
        ReportData {
            headers: vec![ReportHeader {
                id: "text".to_string(),
            }],
            data: vec![
                ReportRow::new(1).with_field("text", "apple"),
                ReportRow::new(2).with_field("text", "banana"),
            ],
        }
    }

    fn neighbor(id: i64, title: &str, distance: f32) -> Neighbor {
        Neighbor {
            id: RecordId::Number(id),
            title: title.to_string(),
            url: RecordId::Number(id),
            distance,
        }
    }

    fn fields(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.field.as_str()).collect()
    }

    #[test]
    fn test_default_view_shows_report_rows() {
        let view = SearchView::new(report());

        assert!(!view.can_search());
        assert!(!view.showing_results());
        assert_eq!(fields(&view.columns()), vec!["record_id", "text"]);

        let rows = view.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].row_id(), &RecordId::Number(2));
    }

    #[test]
    fn test_column_shape() {
        let columns = SearchView::new(report()).columns();
        assert_eq!(columns[0].header_name, "Record");
        assert_eq!(columns[0].width, 100);
        assert_eq!(columns[0].kind, CellKind::Link);
        assert_eq!(columns[1].header_name, "Text");
        assert_eq!(columns[1].width, 950);
        assert!(columns[1].sortable);
    }

    #[test]
    fn test_empty_report_uses_result_columns() {
        let view = SearchView::new(ReportData::default());
        assert_eq!(fields(&view.columns()), vec!["id", "title"]);
        assert!(view.rows().is_empty());
    }

    #[test]
    fn test_progress_lifecycle() {
        let mut view = SearchView::new(report());

        view.apply(&WorkerEvent::Initiate {
            file: "config.json".to_string(),
        });
        view.apply(&WorkerEvent::Initiate {
            file: "onnx/model.onnx".to_string(),
        });
        assert!(view.is_loading());
        assert_eq!(view.progress_items()[1].label(), "onnx/model.onnx (0.00%)");

        view.apply(&WorkerEvent::Progress {
            file: "onnx/model.onnx".to_string(),
            progress: 42.5,
        });
        assert_eq!(view.progress_items()[1].label(), "onnx/model.onnx (42.50%)");

        view.apply(&WorkerEvent::Done {
            file: "config.json".to_string(),
        });
        let files: Vec<&str> = view
            .progress_items()
            .iter()
            .map(|i| i.file.as_str())
            .collect();
        assert_eq!(files, vec!["onnx/model.onnx"]);

        view.apply(&WorkerEvent::Done {
            file: "onnx/model.onnx".to_string(),
        });
        view.apply(&WorkerEvent::Ready);
        assert!(view.progress_items().is_empty());
        assert!(view.can_search());
        assert!(!view.is_loading());
    }

    #[test]
    fn test_results_replace_rows() {
        let mut view = SearchView::new(report());
        view.apply(&WorkerEvent::Ready);

        let request = view.submit_query("  fruit ");
        assert_eq!(request, Some(WorkerRequest::search("fruit")));
        assert!(!view.can_search());

        view.apply(&WorkerEvent::complete(vec![
            neighbor(2, "banana", 0.1),
            neighbor(1, "apple", 0.4),
        ]));
        assert!(view.can_search());
        assert!(view.showing_results());
        assert_eq!(fields(&view.columns()), vec!["id", "title"]);

        let rows = view.rows();
        let ids: Vec<&RecordId> = rows.iter().map(GridRow::row_id).collect();
        assert_eq!(ids, vec![&RecordId::Number(2), &RecordId::Number(1)]);
    }

    #[test]
    fn test_empty_query_resets_without_request() {
        let mut view = SearchView::new(report());
        view.apply(&WorkerEvent::Ready);
        view.submit_query("fruit");
        view.apply(&WorkerEvent::complete(vec![neighbor(1, "apple", 0.2)]));

        assert_eq!(view.submit_query("   "), None);
        assert!(!view.showing_results());
        assert!(view.can_search());
        assert_eq!(fields(&view.columns()), vec!["record_id", "text"]);
        assert_eq!(view.rows().len(), 2);
    }

    #[test]
    fn test_error_disables_search() {
        let mut view = SearchView::new(report());
        view.apply(&WorkerEvent::Ready);
        view.apply(&WorkerEvent::error("Could not initialize vector database"));

        assert!(!view.can_search());
        assert_eq!(view.error(), Some("Could not initialize vector database"));
    }

    #[test]
    fn test_record_link_uses_record_column() {
        let linker = RecordLinker::new("https://tririga.example.com");
        let view = SearchView::new(report());
        let row = GridRow::Neighbor(neighbor(7, "pump", 0.0));
        assert!(view.record_link(&linker, &row).contains("specId=7&"));
    }

    #[test]
    fn test_embed_request_from_report() {
        let view = SearchView::new(report());
        assert_eq!(
            view.embed_request(),
            WorkerRequest::Embed {
                data: report().data,
                header: Some("text".to_string()),
            }
        );
    }
}
