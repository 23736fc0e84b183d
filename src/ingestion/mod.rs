//! Batch ingestion pipeline.
//!
//! Loads papers from a [`PaperProvider`], embeds them chunk by chunk with a
//! single batch call per chunk and stores each one through the
//! [`VectorStoreManager`].
//!
//! ```ignore
//! let pipeline = IngestionPipeline::new(&generator, &manager, Some(64));
//! let provider = JsonFilePaperProvider::new("papers.json");
//! let stats = pipeline.ingest_from_provider(&provider).await?;
//! println!("Inserted: {}, failed: {}", stats.inserted, stats.failed);
//! ```

use thiserror::Error;
use tracing::{info, warn};

use crate::embedding::{EmbeddingError, EmbeddingGenerator, EmbeddingProvider};
use crate::manager::VectorStoreManager;
use crate::models::PaperMetadata;
use crate::provider::{PaperProvider, ProviderError};
use crate::storage::VectorStore;

/// Default number of papers embedded per model call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Embedding generation failed for a whole chunk
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Provider operation failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Statistics from an ingestion run.
#[derive(Debug, Default)]
pub struct IngestionStats {
    /// Total number of input papers processed
    pub total_processed: usize,

    /// Number of papers successfully stored
    pub inserted: usize,

    /// Number of papers the store rejected
    pub failed: usize,

    /// Identifiers of stored papers, in input order
    pub paper_ids: Vec<String>,
}

impl IngestionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inserted(&mut self, paper_id: String) {
        self.total_processed += 1;
        self.inserted += 1;
        self.paper_ids.push(paper_id);
    }

    pub fn record_failed(&mut self) {
        self.total_processed += 1;
        self.failed += 1;
    }

    fn merge(&mut self, other: IngestionStats) {
        self.total_processed += other.total_processed;
        self.inserted += other.inserted;
        self.failed += other.failed;
        self.paper_ids.extend(other.paper_ids);
    }
}

/// Ingestion pipeline coordinator.
pub struct IngestionPipeline<'a, E, S> {
    embeddings: &'a EmbeddingGenerator<E>,
    store: &'a VectorStoreManager<S>,
    batch_size: usize,
}

impl<'a, E, S> IngestionPipeline<'a, E, S>
where
    E: EmbeddingProvider,
    S: VectorStore,
{
    /// Create a pipeline; `batch_size` defaults to [`DEFAULT_BATCH_SIZE`].
    pub fn new(
        embeddings: &'a EmbeddingGenerator<E>,
        store: &'a VectorStoreManager<S>,
        batch_size: Option<usize>,
    ) -> Self {
        Self {
            embeddings,
            store,
            batch_size: batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed and store one chunk of papers.
    ///
    /// A rejected write is logged and counted; an embedding failure aborts.
    pub async fn ingest_chunk(&self, papers: &[PaperMetadata]) -> IngestionResult<IngestionStats> {
        let mut stats = IngestionStats::new();
        if papers.is_empty() {
            return Ok(stats);
        }

        let texts: Vec<String> = papers.iter().map(PaperMetadata::embedding_text).collect();
        let embeddings = self.embeddings.encode_batch(&texts).await?;

        for (paper, embedding) in papers.iter().zip(embeddings) {
            match self.store.add_paper(embedding, paper.clone()).await {
                Ok(paper_id) => stats.record_inserted(paper_id),
                Err(e) => {
                    warn!(title = %paper.title, error = %e, "Failed to store paper");
                    stats.record_failed();
                }
            }
        }

        Ok(stats)
    }

    /// Ingest papers in chunks of `batch_size`.
    ///
    /// `on_chunk` is called with the number of papers finished after each chunk.
    pub async fn ingest_batch<F>(&self, papers: &[PaperMetadata], mut on_chunk: F) -> IngestionResult<IngestionStats>
    where
        F: FnMut(usize),
    {
        let mut stats = IngestionStats::new();

        for chunk in papers.chunks(self.batch_size) {
            stats.merge(self.ingest_chunk(chunk).await?);
            on_chunk(chunk.len());
        }

        Ok(stats)
    }

    /// Fetch everything from `provider` and ingest it.
    pub async fn ingest_from_provider<P>(&self, provider: &P) -> IngestionResult<IngestionStats>
    where
        P: PaperProvider,
    {
        let papers = provider.fetch_papers().await?;
        info!(provider = provider.name(), count = papers.len(), "Starting ingestion");

        let stats = self.ingest_batch(&papers, |_| {}).await?;
        info!(
            inserted = stats.inserted,
            failed = stats.failed,
            "Ingestion finished"
        );
        Ok(stats)
    }
}
