//! In-process [`VectorStore`] used by tests.
//!
//! Brute-force cosine ranking over everything in a collection, with knobs to
//! make individual operations fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    CollectionConfig, PaperPoint, PayloadFilter, PointId, ScoredPoint, StorageError,
    StorageResult, VectorStore,
};

/// Cosine similarity between two vectors; zero when either has no magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    // Insertion order keeps ranking ties deterministic
    points: Vec<PaperPoint>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct InMemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
    list_failures_remaining: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    upsert_calls: Arc<AtomicUsize>,
    fail_create: bool,
    fail_upsert: bool,
    fail_search: bool,
    fail_recommend: bool,
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make the first `count` liveness checks fail with a connection error.
    pub(crate) fn failing_first_connects(self, count: usize) -> Self {
        self.list_failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_existing_collection(self, name: &str, dimension: usize) -> Self {
        self.collections.lock().unwrap().insert(
            name.to_string(),
            Collection {
                dimension,
                points: Vec::new(),
            },
        );
        self
    }

    pub(crate) fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub(crate) fn failing_upsert(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    pub(crate) fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub(crate) fn failing_recommend(mut self) -> Self {
        self.fail_recommend = true;
        self
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn collection_dimension(&self, name: &str) -> Option<usize> {
        self.collections.lock().unwrap().get(name).map(|c| c.dimension)
    }

    pub(crate) fn point_count(&self, name: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(name)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    fn rank(
        collection: &Collection,
        query: &[f32],
        filter: Option<&PayloadFilter>,
        exclude: &[PointId],
        limit: usize,
    ) -> Vec<ScoredPoint> {
        let mut hits: Vec<ScoredPoint> = collection
            .points
            .iter()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
            .filter(|p| !exclude.contains(&p.id))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(query, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        hits
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn list_collections(&self) -> StorageResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.list_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.list_failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::ConnectionError("connection refused".to_string()));
        }
        Ok(self.collections.lock().unwrap().keys().cloned().collect())
    }

    async fn create_collection(&self, config: &CollectionConfig) -> StorageResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(StorageError::QueryError("create rejected".to_string()));
        }
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(&config.name) {
            return Err(StorageError::QueryError(format!(
                "collection `{}` already exists",
                config.name
            )));
        }
        collections.insert(
            config.name.clone(),
            Collection {
                dimension: config.dimension,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert_point(&self, collection: &str, point: PaperPoint) -> StorageResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert {
            return Err(StorageError::QueryError("upsert rejected".to_string()));
        }
        let mut collections = self.collections.lock().unwrap();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StorageError::NotFound(collection.to_string()))?;
        if point.vector.len() != target.dimension {
            return Err(StorageError::QueryError(format!(
                "wrong vector dimension: expected {}, got {}",
                target.dimension,
                point.vector.len()
            )));
        }
        match target.points.iter_mut().find(|p| p.id == point.id) {
            Some(existing) => *existing = point,
            None => target.points.push(point),
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&PayloadFilter>,
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>> {
        if self.fail_search {
            return Err(StorageError::ConnectionError("search timed out".to_string()));
        }
        let collections = self.collections.lock().unwrap();
        let target = collections
            .get(collection)
            .ok_or_else(|| StorageError::NotFound(collection.to_string()))?;
        Ok(Self::rank(target, vector, filter, &[], limit))
    }

    async fn recommend(
        &self,
        collection: &str,
        positive: &[PointId],
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>> {
        if self.fail_recommend {
            return Err(StorageError::QueryError("recommend rejected".to_string()));
        }
        let collections = self.collections.lock().unwrap();
        let target = collections
            .get(collection)
            .ok_or_else(|| StorageError::NotFound(collection.to_string()))?;

        let mut query = vec![0.0; target.dimension];
        for id in positive {
            let point = target
                .points
                .iter()
                .find(|p| &p.id == id)
                .ok_or_else(|| StorageError::NotFound(format!("no point with id {}", id)))?;
            for (acc, x) in query.iter_mut().zip(&point.vector) {
                *acc += x;
            }
        }

        Ok(Self::rank(target, &query, None, positive, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
