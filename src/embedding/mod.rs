//! Embedding provider abstraction and the embedding generator.
//!
//! [`EmbeddingProvider`] is the seam to a pretrained sentence-encoding model.
//! [`EmbeddingGenerator`] wraps a provider and adds the rules every caller
//! relies on:
//!
//! - blank text maps to the zero vector without touching the model
//! - an empty batch maps to an empty result without touching the model
//! - batch encoding is element-wise equal to single encoding
//! - every returned vector has exactly [`EmbeddingProvider::dimension`] components

pub mod fastembed;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::models::EmbeddingConfig;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The model could not be loaded; the generator is unusable
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    /// The model failed while encoding
    #[error("Embedding generation failed: {0}")]
    Encoding(String),

    /// The model produced a vector of the wrong length
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Unknown model name
    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for text embedding models.
///
/// Implementors run the underlying model. They are not expected to handle
/// blank input specially; [`EmbeddingGenerator`] never passes blank text on.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Generate embeddings for multiple texts in a single model invocation.
    ///
    /// # Returns
    /// A vector of embedding vectors, in the same order as the input texts
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier for this provider.
    fn model_name(&self) -> &str;
}

/// Maps text to fixed-length vectors suitable for similarity comparison.
///
/// The model is loaded by whoever constructs the provider; the generator
/// holds it for its whole lifetime and treats it as read-only.
#[derive(Debug, Clone)]
pub struct EmbeddingGenerator<E> {
    provider: E,
}

impl<E> EmbeddingGenerator<E>
where
    E: EmbeddingProvider,
{
    /// Create a generator around an already loaded model.
    pub fn new(provider: E) -> Self {
        Self { provider }
    }

    /// Number of components in every vector this generator returns.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Configuration a collection must be created with to hold these vectors.
    pub fn config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            model_name: self.model_name().to_string(),
            dimension: self.dimension(),
        }
    }

    /// The vector returned for blank text.
    pub fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimension()]
    }

    /// Encode a single text.
    ///
    /// Empty or whitespace-only text yields the zero vector and the model is
    /// not invoked. Otherwise the model runs exactly once.
    ///
    /// # Errors
    /// Returns `EmbeddingError` if the model fails or returns a vector of the
    /// wrong length
    pub async fn encode(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if is_blank(text) {
            return Ok(self.zero_vector());
        }

        let embedding = self.provider.embed(text).await?;
        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    /// Encode an ordered batch of texts.
    ///
    /// The output has one vector per input, in input order. An empty batch
    /// returns an empty result without invoking the model. Blank entries get
    /// the zero vector and are left out of the model call, so the result is
    /// the same as calling [`encode`](Self::encode) on each element.
    pub async fn encode_batch<S>(&self, texts: &[S]) -> EmbeddingResult<Vec<Vec<f32>>>
    where
        S: AsRef<str> + Sync,
    {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let pending: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| (idx, text.as_ref()))
            .filter(|(_, text)| !is_blank(text))
            .collect();

        let mut results = vec![self.zero_vector(); texts.len()];
        if pending.is_empty() {
            debug!(count = texts.len(), "Batch contains only blank texts");
            return Ok(results);
        }

        let inputs: Vec<&str> = pending.iter().map(|(_, text)| *text).collect();
        let embeddings = self.provider.embed_batch(&inputs).await?;

        if embeddings.len() != inputs.len() {
            return Err(EmbeddingError::Encoding(format!(
                "model returned {} embeddings for {} texts",
                embeddings.len(),
                inputs.len()
            )));
        }

        for ((idx, _), embedding) in pending.into_iter().zip(embeddings) {
            self.check_dimension(&embedding)?;
            results[idx] = embedding;
        }

        Ok(results)
    }

    fn check_dimension(&self, embedding: &[f32]) -> EmbeddingResult<()> {
        let expected = self.dimension();
        if embedding.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
