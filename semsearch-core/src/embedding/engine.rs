//! Embedder handle
//!
//! High-level API over a loaded model: L2 normalization, dimension checks and
//! an exact-text cache.

use super::model::TextEmbedder;
use crate::error::{Result, SearchError};
use dashmap::DashMap;
use std::sync::Arc;

struct Inner {
    model: Arc<dyn TextEmbedder>,
    cache: DashMap<String, Vec<f32>>,
    dimension: usize,
}

/// Cheaply cloneable handle to the loaded embedding model
///
/// Every vector it returns has the model dimension and unit length (zero
/// vectors stay zero).
#[derive(Clone)]
pub struct EmbedderHandle {
    inner: Arc<Inner>,
}

impl EmbedderHandle {
    pub fn new(model: Arc<dyn TextEmbedder>) -> Self {
        let dimension = model.dimension();
        Self {
            inner: Arc::new(Inner {
                model,
                cache: DashMap::new(),
                dimension,
            }),
        }
    }

    /// Generate embedding with caching
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.inner.cache.get(text) {
            return Ok(cached.clone());
        }

        let mut vectors = self.inner.model.embed_batch(&[text])?;
        let vector = vectors
            .pop()
            .ok_or_else(|| SearchError::embedding("model returned no embeddings"))?;
        let vector = self.finish(vector)?;
        self.inner.cache.insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    /// Batch embed with caching
    ///
    /// Fails as a whole if any text fails.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| self.inner.cache.get(*text).map(|v| v.clone()))
            .collect();

        let uncached: Vec<(usize, &str)> = results
            .iter()
            .enumerate()
            .filter(|(_, cached)| cached.is_none())
            .map(|(i, _)| (i, texts[i]))
            .collect();

        if uncached.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        let uncached_texts: Vec<&str> = uncached.iter().map(|(_, t)| *t).collect();
        let new_embeddings = self.inner.model.embed_batch(&uncached_texts)?;
        if new_embeddings.len() != uncached_texts.len() {
            return Err(SearchError::embedding(format!(
                "model returned {} embeddings for {} texts",
                new_embeddings.len(),
                uncached_texts.len()
            )));
        }

        for ((idx, text), emb) in uncached.iter().zip(new_embeddings) {
            let emb = self.finish(emb)?;
            self.inner.cache.insert(text.to_string(), emb.clone());
            results[*idx] = Some(emb);
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Embed a query on a blocking thread
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let handle = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || handle.embed(&text))
            .await
            .map_err(|e| SearchError::embedding(format!("spawn_blocking join error: {}", e)))?
    }

    fn finish(&self, mut vector: Vec<f32>) -> Result<Vec<f32>> {
        if vector.len() != self.inner.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.inner.dimension,
                actual: vector.len(),
            });
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.inner.dimension
    }

    pub fn model_name(&self) -> &str {
        self.inner.model.model_name()
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.inner.cache.len()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }
}

impl std::fmt::Debug for EmbedderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedderHandle")
            .field("model", &self.model_name())
            .field("dimension", &self.dimension())
            .field("cache_size", &self.cache_size())
            .finish()
    }
}

/// Scale a vector to unit length in place
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how many texts reach the model
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl TextEmbedder for CountingEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct WrongDimension;

    impl TextEmbedder for WrongDimension {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; 3]).collect())
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "wrong"
        }
    }

    fn counting() -> (EmbedderHandle, Arc<CountingEmbedder>) {
        let model = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        (EmbedderHandle::new(model.clone()), model)
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0_f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0_f32; 3];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);
    }

    #[test]
    fn test_embed_returns_unit_vectors() {
        let (handle, _) = counting();
        let v = handle.embed("apple").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(handle.dimension(), 2);
    }

    #[test]
    fn test_embed_uses_cache() {
        let (handle, model) = counting();
        handle.embed("apple").unwrap();
        handle.embed("apple").unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.cache_size(), 1);

        handle.clear_cache();
        handle.embed("apple").unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_batch_only_embeds_uncached_texts() {
        let (handle, model) = counting();
        handle.embed("banana").unwrap();

        let vectors = handle.embed_batch(&["apple", "banana", "kiwi"]).unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(vectors[1], handle.embed("banana").unwrap());
    }

    #[test]
    fn test_debug_shows_model_and_cache() {
        let (handle, _) = counting();
        handle.embed("apple").unwrap();
        assert_eq!(
            format!("{:?}", handle),
            "EmbedderHandle { model: \"counting\", dimension: 2, cache_size: 1 }"
        );
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let handle = EmbedderHandle::new(Arc::new(WrongDimension));
        let err = handle.embed("x").unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
        assert!(handle.embed_batch(&["a", "b"]).is_err());
    }

    #[tokio::test]
    async fn test_embed_query_off_thread() {
        let (handle, _) = counting();
        let v = handle.embed_query("fruit").await.unwrap();
        assert_eq!(v, handle.embed("fruit").unwrap());
    }
}
