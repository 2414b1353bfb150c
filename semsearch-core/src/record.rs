//! Report row and embedding record types
//!
//! A report row is a required `record_id` plus an open-ended map of display
//! fields. One of those fields (the report's first header) carries the text
//! that gets embedded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a source record
///
/// Upstream reports hand out numeric ids for most business objects but some
/// views return them as strings, so both shapes are accepted and serialized
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One row of a tabular report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub record_id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ReportRow {
    /// Create a row with no display fields
    pub fn new(record_id: impl Into<RecordId>) -> Self {
        Self {
            record_id: record_id.into(),
            fields: Map::new(),
        }
    }

    /// Add a display field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Text of a display field
    ///
    /// Strings are returned as-is, numbers and booleans as their JSON text.
    /// Missing, null and structured values have no text.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// A report row paired with its embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: RecordId,
    pub title: String,
    pub url: RecordId,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}
