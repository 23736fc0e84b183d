//! Deterministic bag-of-words embedding model for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// Hashes each lowercase word into one bucket, so texts sharing words have
/// positive cosine similarity and texts sharing none are orthogonal (barring
/// bucket collisions).
#[derive(Debug, Clone)]
pub(crate) struct MockEmbeddingProvider {
    dimension: usize,
    output_dimension: usize,
    should_fail: bool,
    embed_calls: Arc<AtomicUsize>,
    batch_calls: Arc<AtomicUsize>,
    last_batch_size: Arc<AtomicUsize>,
}

impl MockEmbeddingProvider {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            output_dimension: dimension,
            should_fail: false,
            embed_calls: Arc::new(AtomicUsize::new(0)),
            batch_calls: Arc::new(AtomicUsize::new(0)),
            last_batch_size: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report `dimension` but actually produce vectors of `actual` length.
    pub(crate) fn with_output_dimension(mut self, actual: usize) -> Self {
        self.output_dimension = actual;
        self
    }

    pub(crate) fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub(crate) fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_batch_size(&self) -> usize {
        self.last_batch_size.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if self.should_fail {
            return Err(EmbeddingError::Encoding("mock model failure".to_string()));
        }

        let mut embedding = vec![0.0; self.output_dimension];
        if self.output_dimension == 0 {
            return Ok(embedding);
        }
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.output_dimension;
            embedding[bucket] += 1.0;
        }
        Ok(embedding)
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.vectorize(text)
    }

    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.last_batch_size.store(texts.len(), Ordering::SeqCst);
        texts.iter().map(|text| self.vectorize(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
