//! In-memory vector index
//!
//! Exact cosine-distance scan over an immutable snapshot of records. Large
//! snapshots also get an instant-distance HNSW graph whose candidates are
//! re-ranked exactly, so both paths order results the same way.

use instant_distance::{Builder, HnswMap, Point, Search};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SearchError};
use crate::record::{EmbeddingRecord, RecordId};

/// Index build parameters
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Record count at which an HNSW graph is built (default: 10000)
    pub hnsw_threshold: usize,
    /// HNSW construction beam width (default: 100)
    pub ef_construction: usize,
    /// HNSW candidates per query (default: 100)
    pub ef_search: usize,
    /// HNSW level assignment seed
    pub seed: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hnsw_threshold: 10_000,
            ef_construction: 100,
            ef_search: 100,
            seed: 42,
        }
    }
}

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: RecordId,
    pub title: String,
    pub url: RecordId,
    /// Cosine distance, 0 for identical direction
    pub distance: f32,
}

/// Neighbors in ascending distance order
pub type SearchResult = Vec<Neighbor>;

/// HNSW point wrapper
#[derive(Clone)]
struct IndexPoint(Vec<f32>);

impl Point for IndexPoint {
    fn distance(&self, other: &Self) -> f32 {
        cosine_distance(&self.0, &other.0)
    }
}

/// Immutable nearest-neighbor index over one report's records
pub struct VectorIndex {
    records: Vec<EmbeddingRecord>,
    dimension: Option<usize>,
    hnsw: Option<HnswMap<IndexPoint, usize>>,
    /// Candidates one graph query yields
    ef_search: usize,
}

impl VectorIndex {
    /// Build a fresh index
    ///
    /// All records must share one non-zero dimension and have distinct ids.
    /// Insertion order is the input order and breaks distance ties.
    pub fn build(records: Vec<EmbeddingRecord>, config: &IndexConfig) -> Result<Self> {
        let dimension = records.first().map(EmbeddingRecord::dimension);

        if let Some(dim) = dimension {
            if dim == 0 {
                return Err(SearchError::invalid_input("embedding vectors are empty"));
            }
            if let Some(bad) = records.iter().find(|r| r.dimension() != dim) {
                return Err(SearchError::DimensionMismatch {
                    expected: dim,
                    actual: bad.dimension(),
                });
            }
        }

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(&record.id) {
                return Err(SearchError::DuplicateRecord(record.id.to_string()));
            }
        }

        let hnsw = if !records.is_empty() && records.len() >= config.hnsw_threshold {
            let points: Vec<IndexPoint> = records
                .iter()
                .map(|r| IndexPoint(r.vector.clone()))
                .collect();
            let values: Vec<usize> = (0..records.len()).collect();
            Some(
                Builder::default()
                    .ef_construction(config.ef_construction)
                    .ef_search(config.ef_search)
                    .seed(config.seed)
                    .build(points, values),
            )
        } else {
            None
        };

        log::info!(
            "Built vector index: {} records, {}d, {}",
            records.len(),
            dimension.unwrap_or(0),
            if hnsw.is_some() { "hnsw" } else { "exact" }
        );

        Ok(Self {
            records,
            dimension,
            hnsw,
            ef_search: config.ef_search,
        })
    }

    /// Up to `k` nearest records, ascending by distance
    ///
    /// An empty index answers every query with no neighbors.
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchResult> {
        if k == 0 {
            return Err(SearchError::invalid_input("k must be positive"));
        }
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(SearchError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        // The graph yields at most `ef_search` candidates
        let mut scored: Vec<(usize, f32)> = match &self.hnsw {
            Some(hnsw) if k < self.ef_search => {
                let point = IndexPoint(query.to_vec());
                let mut search = Search::default();
                hnsw.search(&point, &mut search)
                    .map(|item| {
                        let idx = *item.value;
                        (idx, cosine_distance(query, &self.records[idx].vector))
                    })
                    .collect()
            }
            _ => self
                .records
                .iter()
                .enumerate()
                .map(|(idx, r)| (idx, cosine_distance(query, &r.vector)))
                .collect(),
        };

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(idx, distance)| {
                let record = &self.records[idx];
                Neighbor {
                    id: record.id.clone(),
                    title: record.title.clone(),
                    url: record.url.clone(),
                    distance,
                }
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Vector dimension, `None` for an empty index
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Whether queries go through the HNSW graph
    pub fn uses_graph(&self) -> bool {
        self.hnsw.is_some()
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }
}

/// Cosine distance = 1 - similarity, floored at 0
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).max(0.0)
}

/// Calculate cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
