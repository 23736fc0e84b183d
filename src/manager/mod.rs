//! Vector store manager.
//!
//! Owns one collection in the vector-storage engine and mediates every read
//! and write to it. A manager only exists once startup has finished:
//!
//! 1. **Connecting**: run a liveness check (list collections), retrying on
//!    failure according to a [`RetryPolicy`]. Exhausting the attempts is fatal.
//! 2. **Provisioning**: create the collection with the configured dimension and
//!    distance if it is missing. An existing collection is used as is.
//! 3. **Ready**: [`VectorStoreManager::connect`] returns the manager and all
//!    operations are available.
//!
//! Per-call storage failures propagate unchanged, with one exception:
//! [`VectorStoreManager::find_similar_papers`] turns every failure into an
//! empty result. [`VectorStoreManager::lookup_similar`] keeps the distinction
//! for callers that need it.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{PaperMetadata, SearchResult, SimilarPaper};
use crate::storage::{
    CollectionConfig, PaperPoint, PayloadFilter, PointId, StorageError, VectorStore,
};

/// Errors raised by the vector store manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The engine did not answer the liveness check within the retry budget
    #[error("Failed to connect to vector store after {attempts} attempts: {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: StorageError,
    },

    /// The collection was missing and could not be created
    #[error("Failed to provision collection: {0}")]
    ProvisioningFailed(#[source] StorageError),

    /// A single read or write failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Result limits must be positive
    #[error("Invalid limit: {0} (must be at least 1)")]
    InvalidLimit(usize),

    /// The vector does not match the collection's dimension
    #[error("Vector dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl ManagerError {
    /// Whether the error means the process cannot serve at all, as opposed
    /// to a single failed request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ManagerError::ConnectionFailed { .. } | ManagerError::ProvisioningFailed(_)
        )
    }
}

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Bounded retry policy for the startup connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Fixed wait between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

/// Outcome of a similarity-by-id lookup.
#[derive(Debug)]
pub enum SimilarLookup {
    /// The engine returned at least one neighbor
    Matches(Vec<SimilarPaper>),

    /// The lookup succeeded but found nothing
    NoMatches,

    /// The lookup failed (unknown id, engine error, invalid limit)
    Failed(ManagerError),
}

impl SimilarLookup {
    /// Collapse to the public contract: failures read as "no similar papers".
    pub fn into_papers(self) -> Vec<SimilarPaper> {
        match self {
            SimilarLookup::Matches(papers) => papers,
            SimilarLookup::NoMatches | SimilarLookup::Failed(_) => Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SimilarLookup::Failed(_))
    }
}

/// Manager for the single paper collection.
///
/// Holds the storage client for the life of the process. It adds no locking
/// of its own; concurrent use is as safe as the underlying store.
#[derive(Debug)]
pub struct VectorStoreManager<S> {
    store: S,
    collection: CollectionConfig,
}

impl<S> VectorStoreManager<S>
where
    S: VectorStore,
{
    /// Connect to the engine and make sure the collection exists.
    ///
    /// # Errors
    /// Returns `ManagerError::ConnectionFailed` with the last underlying cause
    /// once every attempt has failed, or `ManagerError::ProvisioningFailed` if
    /// the collection has to be created and creation fails
    pub async fn connect(store: S, collection: CollectionConfig, retry: RetryPolicy) -> ManagerResult<Self> {
        let existing = Self::wait_for_store(&store, retry).await?;

        if existing.iter().any(|name| *name == collection.name) {
            info!(collection = %collection.name, "Collection already exists");
        } else {
            store
                .create_collection(&collection)
                .await
                .map_err(ManagerError::ProvisioningFailed)?;
            info!(
                collection = %collection.name,
                dimension = collection.dimension,
                distance = ?collection.distance,
                "Collection created"
            );
        }

        Ok(Self { store, collection })
    }

    async fn wait_for_store(store: &S, retry: RetryPolicy) -> ManagerResult<Vec<String>> {
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match store.list_collections().await {
                Ok(names) => {
                    info!(attempt, "Connected to vector store");
                    return Ok(names);
                }
                Err(source) if attempt >= max_attempts => {
                    return Err(ManagerError::ConnectionFailed {
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Vector store not reachable, retrying in {:?}",
                        retry.delay
                    );
                    tokio::time::sleep(retry.delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Configuration of the managed collection.
    pub fn collection(&self) -> &CollectionConfig {
        &self.collection
    }

    /// Store a paper and return its freshly generated identifier.
    ///
    /// The write is an upsert keyed by the new UUID.
    ///
    /// # Errors
    /// Returns `ManagerError::DimensionMismatch` before writing if the vector
    /// has the wrong length; storage failures propagate as `ManagerError::Storage`
    pub async fn add_paper(&self, embedding: Vec<f32>, metadata: PaperMetadata) -> ManagerResult<String> {
        self.check_dimension(&embedding)?;

        let id = Uuid::new_v4().to_string();
        let point = PaperPoint {
            id: PointId::Uuid(id.clone()),
            vector: embedding,
            payload: metadata,
        };

        self.store.upsert_point(&self.collection.name, point).await?;
        debug!(paper_id = %id, "Paper stored");
        Ok(id)
    }

    /// Nearest papers to `query_embedding`, best first.
    ///
    /// With `filter_category` only papers whose categories contain it are
    /// considered. An empty category string means no filter.
    pub async fn search_papers(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter_category: Option<&str>,
    ) -> ManagerResult<Vec<SearchResult>> {
        if limit == 0 {
            return Err(ManagerError::InvalidLimit(limit));
        }
        self.check_dimension(query_embedding)?;

        let filter = filter_category
            .filter(|category| !category.is_empty())
            .map(PayloadFilter::category);

        let hits = self
            .store
            .search(&self.collection.name, query_embedding, filter.as_ref(), limit)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult::from_metadata(hit.id.to_string(), hit.score, hit.payload))
            .collect())
    }

    /// Papers similar to the stored paper `paper_id`, best first.
    ///
    /// Never fails: an unknown id or an engine error yields an empty list and
    /// is logged. Use [`lookup_similar`](Self::lookup_similar) to tell the cases apart.
    pub async fn find_similar_papers(&self, paper_id: &str, limit: usize) -> Vec<SimilarPaper> {
        let lookup = self.lookup_similar(paper_id, limit).await;
        if let SimilarLookup::Failed(e) = &lookup {
            warn!(paper_id, error = %e, "Similar paper lookup failed");
        }
        lookup.into_papers()
    }

    /// Recommend neighbors of `paper_id` with the stored point as the only
    /// positive example.
    pub async fn lookup_similar(&self, paper_id: &str, limit: usize) -> SimilarLookup {
        if limit == 0 {
            return SimilarLookup::Failed(ManagerError::InvalidLimit(limit));
        }

        let positive = [PointId::from(paper_id)];
        match self
            .store
            .recommend(&self.collection.name, &positive, limit)
            .await
        {
            Ok(hits) if hits.is_empty() => SimilarLookup::NoMatches,
            Ok(hits) => SimilarLookup::Matches(
                hits.into_iter()
                    .map(|hit| SimilarPaper::from_metadata(hit.id.to_string(), hit.score, hit.payload))
                    .collect(),
            ),
            Err(e) => SimilarLookup::Failed(e.into()),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> ManagerResult<()> {
        if vector.len() != self.collection.dimension {
            return Err(ManagerError::DimensionMismatch {
                expected: self.collection.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
