//! Vector storage abstraction.
//!
//! This module defines the interface to the external vector-storage engine
//! that owns indexing, distance computation and persistence. The crate only
//! orchestrates: it provisions a collection, writes points and asks for
//! ranked neighbors.

pub mod qdrant;

#[cfg(test)]
pub(crate) mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PaperMetadata;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage endpoint could not be reached
    #[error("Storage connection failed: {0}")]
    ConnectionError(String),

    /// The engine rejected or failed a request
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// A request or response body could not be (de)serialized
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Collection configuration problem
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Collection or point not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other unexpected errors
    #[error("Unexpected storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// Whether the failure means the engine itself is unreachable.
    pub fn is_connection(&self) -> bool {
        matches!(self, StorageError::ConnectionError(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Distance metric a collection ranks neighbors by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

/// Fixed shape of a collection: set at creation, never migrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
}

impl CollectionConfig {
    /// Cosine collection of the given dimension.
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance: Distance::Cosine,
        }
    }
}

/// Identifier of a stored point.
///
/// Points written by this crate use UUID strings, but the engine also allows
/// unsigned integer ids, so both decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Uuid(String),
    Num(u64),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Uuid(id) => f.write_str(id),
            PointId::Num(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for PointId {
    fn from(id: &str) -> Self {
        match id.parse::<u64>() {
            Ok(num) => PointId::Num(num),
            Err(_) => PointId::Uuid(id.to_string()),
        }
    }
}

/// A paper vector with its metadata, as written to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperPoint {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: PaperMetadata,
}

/// A ranked neighbor returned by the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: PaperMetadata,
}

/// Equality conditions on payload fields; all must hold.
///
/// For list-valued fields a condition holds when any element equals the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadFilter {
    pub must: Vec<FieldMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub key: String,
    pub value: String,
}

impl PayloadFilter {
    /// Filter for papers tagged with `category`.
    pub fn category(category: &str) -> Self {
        Self {
            must: vec![FieldMatch {
                key: "categories".to_string(),
                value: category.to_string(),
            }],
        }
    }

    /// Check a payload against every condition.
    pub fn matches(&self, payload: &PaperMetadata) -> bool {
        self.must.iter().all(|condition| match condition.key.as_str() {
            "categories" => payload.has_category(&condition.value),
            "authors" => payload.authors.iter().any(|a| *a == condition.value),
            "title" => payload.title == condition.value,
            "abstract" => payload.abstract_text == condition.value,
            "publication_date" => payload.publication_date == condition.value,
            _ => false,
        })
    }
}

/// Trait for vector-storage engines.
///
/// Implementations talk to the engine; they do not retry. The engine's own
/// ranking order is preserved in every returned list.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all collections. Doubles as a liveness check.
    async fn list_collections(&self) -> StorageResult<Vec<String>>;

    /// Create a collection with a fixed dimension and distance metric.
    async fn create_collection(&self, config: &CollectionConfig) -> StorageResult<()>;

    /// Insert or replace a point keyed by its id.
    async fn upsert_point(&self, collection: &str, point: PaperPoint) -> StorageResult<()>;

    /// The `limit` nearest neighbors of `vector`, best first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&PayloadFilter>,
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>>;

    /// Neighbors of already stored points, best first.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` when a referenced point is unknown
    async fn recommend(
        &self,
        collection: &str,
        positive: &[PointId],
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>>;
}
