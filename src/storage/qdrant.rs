//! Qdrant storage implementation.
//!
//! Talks to Qdrant's REST API with a single `reqwest::Client` built once and
//! reused for every call. Responses arrive wrapped as
//! `{"result": ..., "status": "ok"}`; failures carry `{"status": {"error": ...}}`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    CollectionConfig, Distance, PaperPoint, PayloadFilter, PointId, ScoredPoint, StorageError,
    StorageResult, VectorStore,
};

/// Connection settings for a Qdrant instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdrantConfig {
    /// Base URL of the REST API (e.g., "http://localhost:6333")
    pub url: String,

    /// Optional API key, sent as the `api-key` header
    pub api_key: Option<String>,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    /// Build a config from host and REST port.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self::new(format!("http://{}:{}", host, port))
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self::from_host_port("localhost", 6333)
    }
}

/// Qdrant-backed [`VectorStore`].
#[derive(Debug, Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: Url,
}

impl QdrantStore {
    /// Build the HTTP client. No request is sent until the first operation.
    ///
    /// # Errors
    /// Returns `StorageError::Other` if the URL or API key is malformed
    pub fn new(config: &QdrantConfig) -> StorageResult<Self> {
        let mut base_url = Url::parse(&config.url)
            .map_err(|e| StorageError::Other(format!("invalid Qdrant URL '{}': {}", config.url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| StorageError::Other(format!("invalid API key: {}", e)))?;
            headers.insert("api-key", value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StorageError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> StorageResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StorageError::Other(format!("invalid endpoint '{}': {}", path, e)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> StorageResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::ConnectionError(format!("{}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or(body);
            debug!(%status, what, message = %message, "Qdrant request failed");
            return Err(if status == StatusCode::NOT_FOUND {
                StorageError::NotFound(format!("{}: {}", what, message))
            } else {
                StorageError::QueryError(format!("{} ({}): {}", what, status, message))
            });
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| StorageError::SerializationError(format!("{}: {}", what, e)))?;
        Ok(envelope.result)
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionsList {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Serialize)]
struct CreateCollectionBody {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: Distance,
}

#[derive(Serialize)]
struct UpsertBody {
    points: Vec<PaperPoint>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<FilterBody>,
}

#[derive(Serialize)]
struct RecommendBody<'a> {
    positive: &'a [PointId],
    limit: usize,
    with_payload: bool,
}

#[derive(Serialize)]
struct FilterBody {
    must: Vec<FieldConditionBody>,
}

#[derive(Serialize)]
struct FieldConditionBody {
    key: String,
    #[serde(rename = "match")]
    matches: MatchValueBody,
}

#[derive(Serialize)]
struct MatchValueBody {
    value: String,
}

impl From<&PayloadFilter> for FilterBody {
    fn from(filter: &PayloadFilter) -> Self {
        Self {
            must: filter
                .must
                .iter()
                .map(|condition| FieldConditionBody {
                    key: condition.key.clone(),
                    matches: MatchValueBody {
                        value: condition.value.clone(),
                    },
                })
                .collect(),
        }
    }
}

/// Pull `status.error` out of an error body, if present.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("status")?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> StorageResult<Vec<String>> {
        let url = self.endpoint("collections")?;
        let list: CollectionsList = self.send(self.client.get(url), "list collections").await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(&self, config: &CollectionConfig) -> StorageResult<()> {
        let url = self.endpoint(&format!("collections/{}", config.name))?;
        let body = CreateCollectionBody {
            vectors: VectorParams {
                size: config.dimension,
                distance: config.distance,
            },
        };

        let created: bool = self
            .send(self.client.put(url).json(&body), "create collection")
            .await?;
        if !created {
            return Err(StorageError::SchemaError(format!(
                "collection '{}' was not created",
                config.name
            )));
        }
        Ok(())
    }

    async fn upsert_point(&self, collection: &str, point: PaperPoint) -> StorageResult<()> {
        let mut url = self.endpoint(&format!("collections/{}/points", collection))?;
        url.query_pairs_mut().append_pair("wait", "true");
        let body = UpsertBody { points: vec![point] };

        let _: serde_json::Value = self
            .send(self.client.put(url).json(&body), "upsert point")
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&PayloadFilter>,
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>> {
        let url = self.endpoint(&format!("collections/{}/points/search", collection))?;
        let body = SearchBody {
            vector,
            limit,
            with_payload: true,
            filter: filter.map(FilterBody::from),
        };

        self.send(self.client.post(url).json(&body), "search points").await
    }

    async fn recommend(
        &self,
        collection: &str,
        positive: &[PointId],
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>> {
        let url = self.endpoint(&format!("collections/{}/points/recommend", collection))?;
        let body = RecommendBody {
            positive,
            limit,
            with_payload: true,
        };

        self.send(self.client.post(url).json(&body), "recommend points").await
    }
}
