//! Paper search service.
//!
//! Composes the [`EmbeddingGenerator`] and the [`VectorStoreManager`] into the
//! three operations a transport layer exposes: ingest a paper, search by text
//! and find papers similar to a stored one. Request validation happens here;
//! HTTP routing and status mapping do not.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::embedding::{EmbeddingError, EmbeddingGenerator, EmbeddingProvider};
use crate::manager::{ManagerError, VectorStoreManager};
use crate::models::{PaperMetadata, SearchResult, SimilarPaper};
use crate::storage::VectorStore;

/// Largest result count a request may ask for.
pub const MAX_RESULT_LIMIT: usize = 50;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Embedding generation failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector store operation failed
    #[error("Vector store error: {0}")]
    Store(#[from] ManagerError),
}

impl ServiceError {
    /// Whether the backing services are unavailable, as opposed to the single
    /// request being bad or failing.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ServiceError::Store(ManagerError::Storage(e)) => e.is_connection(),
            ServiceError::Store(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Request payload for adding a paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPaperRequest {
    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub publication_date: String,

    #[serde(default)]
    pub categories: Vec<String>,
}

impl From<AddPaperRequest> for PaperMetadata {
    fn from(request: AddPaperRequest) -> Self {
        Self {
            title: request.title,
            abstract_text: request.abstract_text,
            authors: request.authors,
            categories: request.categories,
            publication_date: request.publication_date,
        }
    }
}

/// Response payload after adding a paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPaperResponse {
    pub paper_id: String,
    pub embedding_size: usize,
}

/// Request payload for text search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    /// Number of results to return (default: 10)
    #[serde(default = "default_search_limit")]
    pub limit: usize,

    #[serde(default)]
    pub category_filter: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: default_search_limit(),
            category_filter: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_filter = Some(category.into());
        self
    }
}

fn default_search_limit() -> usize {
    10
}

/// Response payload for text search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_found: usize,
    pub results: Vec<SearchResult>,
}

/// Request payload for similar-paper lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarPapersRequest {
    pub paper_id: String,

    /// Number of results to return (default: 5)
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

impl SimilarPapersRequest {
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            limit: default_similar_limit(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

fn default_similar_limit() -> usize {
    5
}

/// Response payload for similar-paper lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarPapersResponse {
    pub similar_to: String,
    pub total_found: usize,
    pub results: Vec<SimilarPaper>,
}

fn validate_limit(limit: usize) -> ServiceResult<()> {
    if limit == 0 || limit > MAX_RESULT_LIMIT {
        return Err(ServiceError::InvalidRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_RESULT_LIMIT, limit
        )));
    }
    Ok(())
}

/// Paper search service.
///
/// Both components are built once at startup and owned here; nothing is
/// global, so tests can run services side by side.
pub struct PaperSearchService<E, S> {
    embeddings: EmbeddingGenerator<E>,
    store: VectorStoreManager<S>,
}

impl<E, S> PaperSearchService<E, S>
where
    E: EmbeddingProvider,
    S: VectorStore,
{
    pub fn new(embeddings: EmbeddingGenerator<E>, store: VectorStoreManager<S>) -> Self {
        Self { embeddings, store }
    }

    pub fn embeddings(&self) -> &EmbeddingGenerator<E> {
        &self.embeddings
    }

    pub fn store(&self) -> &VectorStoreManager<S> {
        &self.store
    }

    /// Embed a paper's title and abstract and store it.
    ///
    /// # Errors
    /// Returns `ServiceError::InvalidRequest` for a blank title; embedding and
    /// storage failures propagate
    pub async fn ingest(&self, request: AddPaperRequest) -> ServiceResult<AddPaperResponse> {
        if request.title.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("title must not be empty".to_string()));
        }

        let metadata = PaperMetadata::from(request);
        let embedding = self.embeddings.encode(&metadata.embedding_text()).await?;
        let embedding_size = embedding.len();

        let paper_id = self.store.add_paper(embedding, metadata).await?;
        info!(%paper_id, "Paper added");

        Ok(AddPaperResponse {
            paper_id,
            embedding_size,
        })
    }

    /// Search papers by free text.
    pub async fn search(&self, request: SearchRequest) -> ServiceResult<SearchResponse> {
        if request.query.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("query must not be empty".to_string()));
        }
        validate_limit(request.limit)?;

        let embedding = self.embeddings.encode(&request.query).await?;
        let results = self
            .store
            .search_papers(&embedding, request.limit, request.category_filter.as_deref())
            .await?;
        debug!(query = %request.query, found = results.len(), "Search finished");

        Ok(SearchResponse {
            query: request.query,
            total_found: results.len(),
            results,
        })
    }

    /// Papers similar to a stored paper. Lookup failures yield no results.
    pub async fn similar(&self, request: SimilarPapersRequest) -> ServiceResult<SimilarPapersResponse> {
        if request.paper_id.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("paper_id must not be empty".to_string()));
        }
        validate_limit(request.limit)?;

        let results = self
            .store
            .find_similar_papers(&request.paper_id, request.limit)
            .await;

        Ok(SimilarPapersResponse {
            similar_to: request.paper_id,
            total_found: results.len(),
            results,
        })
    }
}
