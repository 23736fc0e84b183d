//! Paper provider module.
//!
//! The `PaperProvider` trait abstracts where paper metadata comes from, so the
//! ingestion pipeline can load from local files today and other catalogues
//! later without changing.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::PaperMetadata;

pub mod json;

/// Errors that can occur when fetching papers from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the data format
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Source of paper metadata for ingestion.
///
/// Providers return metadata only; embeddings are generated by the ingestion
/// pipeline. Papers are not deduplicated.
#[async_trait]
pub trait PaperProvider: Send + Sync {
    /// Fetch every paper, in source order.
    async fn fetch_papers(&self) -> ProviderResult<Vec<PaperMetadata>>;

    /// Fetch at most `limit` papers from the start of the source.
    async fn fetch_papers_limit(&self, limit: usize) -> ProviderResult<Vec<PaperMetadata>> {
        let all_papers = self.fetch_papers().await?;
        Ok(all_papers.into_iter().take(limit).collect())
    }

    /// Number of papers available.
    async fn count_papers(&self) -> ProviderResult<usize> {
        self.fetch_papers().await.map(|papers| papers.len())
    }

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
