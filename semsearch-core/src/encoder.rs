//! Batch encoding of report rows
//!
//! Turns rows into `EmbeddingRecord`s using the text of one header field.

use crate::embedding::EmbedderHandle;
use crate::error::{Result, SearchError};
use crate::record::{EmbeddingRecord, RecordId, ReportRow};

/// Encode rows into embedding records on a blocking thread
///
/// The batch is all-or-nothing: any embedding failure fails the whole call.
/// Output order follows input order.
pub async fn encode(
    rows: &[ReportRow],
    header: &str,
    handle: &EmbedderHandle,
) -> Result<Vec<EmbeddingRecord>> {
    let entries = collect_texts(rows, header);
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let handle = handle.clone();
    tokio::task::spawn_blocking(move || embed_entries(entries, &handle))
        .await
        .map_err(|e| SearchError::embedding(format!("spawn_blocking join error: {}", e)))?
}

/// Synchronous variant of [`encode`]
pub fn encode_blocking(
    rows: &[ReportRow],
    header: &str,
    handle: &EmbedderHandle,
) -> Result<Vec<EmbeddingRecord>> {
    embed_entries(collect_texts(rows, header), handle)
}

fn collect_texts(rows: &[ReportRow], header: &str) -> Vec<(RecordId, String)> {
    if header.is_empty() {
        log::warn!("No header field given, nothing to embed");
        return Vec::new();
    }

    let mut skipped = 0;
    let entries: Vec<(RecordId, String)> = rows
        .iter()
        .filter_map(|row| match row.text(header) {
            Some(text) => Some((row.record_id.clone(), text)),
            None => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        log::warn!("Skipped {} rows without a '{}' value", skipped, header);
    }
    entries
}

fn embed_entries(
    entries: Vec<(RecordId, String)>,
    handle: &EmbedderHandle,
) -> Result<Vec<EmbeddingRecord>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<&str> = entries.iter().map(|(_, text)| text.as_str()).collect();
    let vectors = handle.embed_batch(&texts)?;
    if vectors.len() != entries.len() {
        return Err(SearchError::embedding(format!(
            "expected {} embeddings, got {}",
            entries.len(),
            vectors.len()
        )));
    }

    log::debug!("Encoded {} rows", entries.len());

    Ok(entries
        .into_iter()
        .zip(vectors)
        .map(|((id, title), vector)| EmbeddingRecord {
            url: id.clone(),
            id,
            title,
            vector,
        })
        .collect())
}
