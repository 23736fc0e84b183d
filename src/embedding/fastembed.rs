//! FastEmbed embedding provider implementation.
//!
//! Runs a pretrained sentence encoder locally through the fastembed library.
//! The default model is `all-MiniLM-L6-v2`, which produces 384-dimensional
//! vectors compared by cosine similarity.

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Name of the model loaded when none is configured.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// FastEmbed embedding provider.
///
/// Holds the loaded model and its output dimension. Cloning shares the model.
#[derive(Clone)]
pub struct FastEmbedProvider {
    /// The embedding model instance (fastembed needs `&mut` to embed)
    model: Arc<Mutex<TextEmbedding>>,

    /// Model identifier as configured (e.g., "all-MiniLM-L6-v2")
    model_name: String,

    /// Expected dimension of the embedding vectors
    embedding_dimension: usize,
}

impl FastEmbedProvider {
    /// Load the named model.
    ///
    /// The model is downloaded into `cache_dir` on first use. Loading is slow
    /// and happens once; the returned provider reuses the loaded model.
    ///
    /// # Errors
    /// Returns `EmbeddingError::InvalidModel` for unknown names and
    /// `EmbeddingError::ModelLoad` if the model cannot be loaded
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> EmbeddingResult<Self> {
        let model_type = parse_model_name(model_name)?;
        let embedding_dimension = model_dimension(&model_type);

        let mut init_options = InitOptions::new(model_type).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }

        info!(model = model_name, "Loading embedding model");
        let text_embedding = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::ModelLoad(format!("failed to initialize '{}': {}", model_name, e))
        })?;
        info!(model = model_name, dimension = embedding_dimension, "Embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name: model_name.to_string(),
            embedding_dimension,
        })
    }

    /// Load the default model into the default cache directory.
    pub fn with_defaults() -> EmbeddingResult<Self> {
        Self::new(DEFAULT_MODEL_NAME, None)
    }
}

/// Map a sentence-transformers style model name to the fastembed model.
///
/// Both the short (`all-MiniLM-L6-v2`) and the hub (`sentence-transformers/all-MiniLM-L6-v2`)
/// spellings are accepted, case-insensitively.
pub fn parse_model_name(name: &str) -> EmbeddingResult<EmbeddingModel> {
    let lowered = name.trim().to_lowercase();
    let short = lowered.rsplit('/').next().unwrap_or(lowered.as_str());

    match short {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l6-v2-q" => Ok(EmbeddingModel::AllMiniLML6V2Q),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "paraphrase-multilingual-minilm-l12-v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        _ => Err(EmbeddingError::InvalidModel(name.to_string())),
    }
}

/// Output dimension of a supported model.
pub fn model_dimension(model: &EmbeddingModel) -> usize {
    match model {
        EmbeddingModel::AllMiniLML6V2 => 384,
        EmbeddingModel::AllMiniLML6V2Q => 384,
        EmbeddingModel::AllMiniLML12V2 => 384,
        EmbeddingModel::BGESmallENV15 => 384,
        EmbeddingModel::BGEBaseENV15 => 768,
        EmbeddingModel::BGELargeENV15 => 1024,
        EmbeddingModel::ParaphraseMLMiniLML12V2 => 384,
        EmbeddingModel::NomicEmbedTextV15 => 768,
        _ => 384,
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut model = self.model.lock().await;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Encoding(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Encoding("no embedding generated".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.model.lock().await;
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Encoding(format!("batch of {}: {}", texts.len(), e)))
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

// TextEmbedding does not implement Debug
impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.model_name)
            .field("embedding_dimension", &self.embedding_dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingGenerator;

    #[test]
    fn test_parse_model_name_variants() {
        assert!(matches!(
            parse_model_name("all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_model_name("sentence-transformers/all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_model_name(" BGE-Base-EN-v1.5 "),
            Ok(EmbeddingModel::BGEBaseENV15)
        ));
    }

    #[test]
    fn test_parse_unknown_model() {
        let err = parse_model_name("text-embedding-3-small").unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidModel(name) if name == "text-embedding-3-small"));
    }

    #[test]
    fn test_unknown_model_fails_before_loading() {
        let result = FastEmbedProvider::new("no-such-model", None);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
    }

    #[test]
    fn test_model_dimensions() {
        assert_eq!(model_dimension(&EmbeddingModel::AllMiniLML6V2), 384);
        assert_eq!(model_dimension(&EmbeddingModel::BGEBaseENV15), 768);
        assert_eq!(model_dimension(&EmbeddingModel::BGELargeENV15), 1024);
    }

    #[tokio::test]
    #[ignore = "downloads the all-MiniLM-L6-v2 model"]
    async fn test_default_model_produces_384_components() {
        let provider = FastEmbedProvider::with_defaults().expect("model should load");
        assert_eq!(provider.dimension(), 384);

        let embedding = provider.embed("operating system kernels").await.unwrap();
        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|x| x.is_finite()));
    }

    #[tokio::test]
    #[ignore = "downloads the all-MiniLM-L6-v2 model"]
    async fn test_batch_matches_single_with_real_model() {
        let provider = FastEmbedProvider::with_defaults().expect("model should load");
        let generator = EmbeddingGenerator::new(provider);
        let texts = ["Consistency test text", "", "Another sentence about kernels"];

        let batch = generator.encode_batch(&texts).await.unwrap();
        for (text, embedding) in texts.iter().zip(&batch) {
            let single = generator.encode(text).await.unwrap();
            for (a, b) in single.iter().zip(embedding) {
                assert!((a - b).abs() < 1e-4);
            }
        }
    }

    #[tokio::test]
    #[ignore = "downloads the all-MiniLM-L6-v2 model"]
    async fn test_concurrent_embeddings() {
        let provider = Arc::new(FastEmbedProvider::with_defaults().expect("model should load"));

        let mut handles = vec![];
        for i in 0..5 {
            let provider = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                provider.embed(&format!("Concurrent test text {}", i)).await
            }));
        }

        for handle in handles {
            let result = handle.await.expect("task should complete");
            assert_eq!(result.unwrap().len(), 384);
        }
    }
}
