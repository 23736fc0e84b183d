//! Research Hub - semantic search over research papers.
//!
//! Papers are embedded from their title and abstract with a local sentence
//! encoder and stored, together with their metadata, in a Qdrant collection.
//! Free-text queries are embedded the same way and answered by nearest-neighbor
//! search; stored papers can also be used as the query for "more like this".
//!
//! # Architecture
//!
//! - **models**: Paper metadata payload and result projections
//! - **embedding**: Text-to-vector encoding (fastembed)
//! - **storage**: Vector store abstraction and the Qdrant REST client
//! - **manager**: Collection provisioning, connect retries and paper operations
//! - **service**: Validated ingest/search/similar operations for a transport layer
//! - **provider**: Sources of paper metadata for bulk ingestion
//! - **ingestion**: Batched embed-and-store pipeline
//! - **config**: Environment-driven settings
//!
//! # Example
//!
//! ```ignore
//! use research_hub::{
//!     config::Settings,
//!     embedding::{fastembed::FastEmbedProvider, EmbeddingGenerator},
//!     manager::VectorStoreManager,
//!     service::{PaperSearchService, SearchRequest},
//!     storage::qdrant::QdrantStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let provider = FastEmbedProvider::new(&settings.embedding.model_name, settings.embedding.cache_dir.clone())?;
//!     let generator = EmbeddingGenerator::new(provider);
//!
//!     let mut collection = settings.collection.clone();
//!     collection.dimension = generator.config().dimension;
//!     let store = QdrantStore::new(&settings.qdrant)?;
//!     let manager = VectorStoreManager::connect(store, collection, settings.retry).await?;
//!
//!     let service = PaperSearchService::new(generator, manager);
//!     let response = service.search(SearchRequest::new("graph neural networks")).await?;
//!     for result in response.results {
//!         println!("{:.3} {}", result.score, result.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod embedding;
pub mod ingestion;
pub mod manager;
pub mod models;
pub mod provider;
pub mod service;
pub mod storage;

pub use config::Settings;
pub use embedding::{EmbeddingGenerator, EmbeddingProvider};
pub use manager::{RetryPolicy, VectorStoreManager};
pub use models::{EmbeddingConfig, PaperMetadata, SearchResult, SimilarPaper};
pub use service::PaperSearchService;
pub use storage::VectorStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model name
pub const DEFAULT_EMBEDDING_MODEL: &str = embedding::fastembed::DEFAULT_MODEL_NAME;

/// Default embedding dimension for all-MiniLM-L6-v2
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Collection used when none is configured
pub const DEFAULT_COLLECTION_NAME: &str = "research_papers";
