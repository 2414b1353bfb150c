//! Report source boundary and record links
//!
//! The search core consumes only a report's rows and the id of its first
//! header; listing and fetching reports sits behind `ReportSource`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use semsearch_core::{RecordId, ReportRow};
use serde::{Deserialize, Serialize};

use crate::error::{WorkerError, WorkerResult};
use crate::protocol::WorkerRequest;

/// Rows fetched when a report is opened
pub const DEFAULT_REPORT_LIMIT: usize = 1000;

/// Column of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub id: String,
}

/// Rows of one report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub headers: Vec<ReportHeader>,
    #[serde(default)]
    pub data: Vec<ReportRow>,
}

impl ReportData {
    /// Field holding the text to embed
    pub fn text_field(&self) -> Option<&str> {
        self.headers.first().map(|h| h.id.as_str())
    }

    /// `embed` message for this report
    pub fn embed_request(&self) -> WorkerRequest {
        WorkerRequest::Embed {
            data: self.data.clone(),
            header: self.text_field().map(str::to_string),
        }
    }
}

/// Entry of the report list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_id: String,
    pub name: String,
}

/// One page of the report list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryList {
    pub data: Vec<ReportSummary>,
    pub total_count: usize,
}

/// Where reports come from
pub trait ReportSource: Send + Sync {
    /// Zero-based page of reports matching `filters`
    fn query_list(
        &self,
        page: usize,
        page_size: usize,
        filters: &HashMap<String, String>,
    ) -> WorkerResult<QueryList>;

    /// Rows `offset..offset + limit` of a report
    fn report_data(&self, report_id: &str, offset: usize, limit: usize) -> WorkerResult<ReportData>;
}

#[derive(Debug, Deserialize)]
struct ReportFile {
    name: Option<String>,
    #[serde(flatten)]
    report: ReportData,
}

/// Reports stored as `<report_id>.json` files in one directory
pub struct FileReportSource {
    dir: PathBuf,
}

impl FileReportSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn report_ids(&self) -> WorkerResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load(&self, report_id: &str) -> WorkerResult<ReportFile> {
        if report_id.contains(['/', '\\']) || report_id.starts_with('.') {
            return Err(WorkerError::ReportNotFound(report_id.to_string()));
        }

        let path = self.dir.join(format!("{}.json", report_id));
        if !path.is_file() {
            return Err(WorkerError::ReportNotFound(report_id.to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl ReportSource for FileReportSource {
    fn query_list(
        &self,
        page: usize,
        page_size: usize,
        filters: &HashMap<String, String>,
    ) -> WorkerResult<QueryList> {
        let name_filter = filters.get("name").map(|n| n.to_lowercase());

        let mut matching = Vec::new();
        for report_id in self.report_ids()? {
            let name = match self.load(&report_id) {
                Ok(file) => file.name.unwrap_or_else(|| report_id.clone()),
                Err(e) => {
                    tracing::warn!("Skipping unreadable report {}: {}", report_id, e);
                    continue;
                }
            };

            if let Some(filter) = &name_filter {
                if !name.to_lowercase().contains(filter.as_str()) {
                    continue;
                }
            }
            matching.push(ReportSummary { report_id, name });
        }

        let total_count = matching.len();
        let data = matching
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(QueryList { data, total_count })
    }

    fn report_data(&self, report_id: &str, offset: usize, limit: usize) -> WorkerResult<ReportData> {
        let ReportFile { report, .. } = self.load(report_id)?;
        Ok(ReportData {
            headers: report.headers,
            data: report.data.into_iter().skip(offset).take(limit).collect(),
        })
    }
}

/// Builds deep links to source records in a TRIRIGA application
#[derive(Debug, Clone)]
pub struct RecordLinker {
    base_url: String,
}

impl RecordLinker {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, record_id: &RecordId) -> String {
        format!(
            "{}/WebProcess.srv?objectId=750000&actionId=750011&propertyId=208133&projectId=1\
             &specClassType=7&specId={}&specTypeId=106402&action=Edit&managerType=query\
             &altGuiListId=-1&inline=false",
            self.base_url, record_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_report(dir: &Path, id: &str, value: serde_json::Value) {
        std::fs::write(dir.join(format!("{}.json", id)), value.to_string()).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_report(
            dir.path(),
            "1001",
            json!({
                "name": "Work Tasks - Semantic",
                "headers": [{"id": "description"}, {"id": "status"}],
                "data": [
                    {"record_id": 1, "description": "replace pump seal", "status": "open"},
                    {"record_id": 2, "description": "inspect boiler", "status": "closed"},
                    {"record_id": 3, "description": "paint hallway", "status": "open"}
                ]
            }),
        );
        write_report(
            dir.path(),
            "1002",
            json!({
                "name": "Space Requests",
                "headers": [{"id": "title"}],
                "data": []
            }),
        );
        write_report(dir.path(), "1003", json!({"headers": [], "data": []}));
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn test_query_list_sorted_with_total() {
        let dir = fixture();
        let source = FileReportSource::new(dir.path());

        let list = source.query_list(0, 50, &HashMap::new()).unwrap();
        assert_eq!(list.total_count, 3);
        let ids: Vec<&str> = list.data.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(ids, vec!["1001", "1002", "1003"]);
        assert_eq!(list.data[2].name, "1003");
    }

    #[test]
    fn test_query_list_filters_by_name() {
        let dir = fixture();
        let source = FileReportSource::new(dir.path());
        let filters = HashMap::from([("name".to_string(), "semantic".to_string())]);

        let list = source.query_list(0, 50, &filters).unwrap();
        assert_eq!(list.total_count, 1);
        assert_eq!(list.data[0].report_id, "1001");
    }

    #[test]
    fn test_query_list_pagination() {
        let dir = fixture();
        let source = FileReportSource::new(dir.path());

        let second = source.query_list(1, 2, &HashMap::new()).unwrap();
        assert_eq!(second.total_count, 3);
        assert_eq!(second.data.len(), 1);
        assert_eq!(second.data[0].report_id, "1003");

        let past_end = source.query_list(5, 2, &HashMap::new()).unwrap();
        assert!(past_end.data.is_empty());
    }

    #[test]
    fn test_report_data_slices_rows() {
        let dir = fixture();
        let source = FileReportSource::new(dir.path());

        let report = source.report_data("1001", 1, 1).unwrap();
        assert_eq!(report.text_field(), Some("description"));
        assert_eq!(report.data.len(), 1);
        assert_eq!(report.data[0].record_id, RecordId::Number(2));

        let full = source
            .report_data("1001", 0, DEFAULT_REPORT_LIMIT)
            .unwrap();
        assert_eq!(full.data.len(), 3);
    }

    #[test]
    fn test_unknown_report() {
        let dir = fixture();
        let source = FileReportSource::new(dir.path());

        assert!(matches!(
            source.report_data("9999", 0, 10),
            Err(WorkerError::ReportNotFound(_))
        ));
        assert!(matches!(
            source.report_data("../1001", 0, 10),
            Err(WorkerError::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_embed_request_uses_first_header() {
        let dir = fixture();
        let source = FileReportSource::new(dir.path());
        let report = source.report_data("1001", 0, 10).unwrap();

        match report.embed_request() {
            WorkerRequest::Embed { data, header } => {
                assert_eq!(data.len(), 3);
                assert_eq!(header.as_deref(), Some("description"));
            }
            other => panic!("unexpected request: {:?}", other),
        }

        let headerless = ReportData::default().embed_request();
        assert_eq!(
            headerless,
            WorkerRequest::Embed {
                data: vec![],
                header: None
            }
        );
    }

    #[test]
    fn test_record_url() {
        let linker = RecordLinker::new("https://tririga.example.com/");
        let url = linker.url(&RecordId::Number(123456));
        assert!(url.starts_with("https://tririga.example.com/WebProcess.srv?objectId=750000"));
        assert!(url.contains("&specId=123456&specTypeId=106402"));
        assert!(url.ends_with("&altGuiListId=-1&inline=false"));
        assert!(!url.contains(' '));
    }
}
