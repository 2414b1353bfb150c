//! Deterministic model doubles for worker tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use semsearch_core::{ModelLoader, ProgressTracker, ReportRow, SearchError, TextEmbedder};

const VOCAB: &[&str] = &["apple", "banana", "fruit", "basket", "pump", "boiler"];

/// Files the fake loader reports progress for
pub const FAKE_FILES: [&str; 2] = ["config.json", "onnx/model.onnx"];

/// How long a batch containing the stall word takes
pub const STALL: Duration = Duration::from_millis(500);

/// Bag-of-words over a tiny vocabulary, one axis per word
pub struct BagOfWords {
    pub delay: Duration,
    /// Batches containing this text take `STALL`
    pub stall_word: Option<&'static str>,
}

impl TextEmbedder for BagOfWords {
    fn embed_batch(&self, texts: &[&str]) -> semsearch_core::Result<Vec<Vec<f32>>> {
        std::thread::sleep(self.delay);
        if let Some(word) = self.stall_word {
            if texts.contains(&word) {
                std::thread::sleep(STALL);
            }
        }
        Ok(texts
            .iter()
            .map(|text| {
                let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
                VOCAB
                    .iter()
                    .map(|v| words.iter().filter(|w| w == v).count() as f32)
                    .collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        VOCAB.len()
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

#[derive(Default)]
pub struct FakeLoader {
    pub loads: AtomicUsize,
    pub fail: bool,
    /// Per-batch embedding delay
    pub delay: Duration,
    /// Time spent before the first artifact starts
    pub load_delay: Duration,
    pub stall_word: Option<&'static str>,
}

impl FakeLoader {
    pub fn new(fail: bool, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            fail,
            delay,
            ..Default::default()
        })
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for FakeLoader {
    fn load(&self, progress: &ProgressTracker) -> semsearch_core::Result<Arc<dyn TextEmbedder>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.load_delay);
        for file in FAKE_FILES {
            progress.initiate(file);
            progress.update(file, 30, 100);
            if self.fail {
                return Err(SearchError::download(format!("Failed to download {}", file)));
            }
            progress.update(file, 100, 100);
            progress.done(file);
        }
        Ok(Arc::new(BagOfWords {
            delay: self.delay,
            stall_word: self.stall_word,
        }))
    }
}

pub fn fruit_rows() -> Vec<ReportRow> {
    vec![
        ReportRow::new(1).with_field("text", "apple"),
        ReportRow::new(2).with_field("text", "banana"),
        ReportRow::new(3).with_field("text", "fruit basket"),
    ]
}
