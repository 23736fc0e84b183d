//! Runtime configuration.
//!
//! Settings come from environment variables with defaults matching a local
//! Qdrant and the default sentence encoder. Binaries layer command-line flags
//! on top.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::embedding::fastembed::DEFAULT_MODEL_NAME;
use crate::manager::RetryPolicy;
use crate::storage::qdrant::QdrantConfig;
use crate::storage::CollectionConfig;
use crate::{DEFAULT_COLLECTION_NAME, DEFAULT_EMBEDDING_DIMENSION};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Embedding model selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingSettings {
    pub model_name: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir: default_cache_dir(),
        }
    }
}

/// Default model cache: `<user cache dir>/fastembed`.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("fastembed"))
}

/// Everything needed to build the embedding generator and the store manager.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub qdrant: QdrantConfig,
    pub collection: CollectionConfig,
    pub embedding: EmbeddingSettings,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            qdrant: QdrantConfig::default(),
            collection: CollectionConfig::cosine(DEFAULT_COLLECTION_NAME, DEFAULT_EMBEDDING_DIMENSION),
            embedding: EmbeddingSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Recognized keys: `QDRANT_URL` (wins over host/port), `QDRANT_HOST`,
    /// `QDRANT_PORT`, `QDRANT_API_KEY`, `PAPERS_COLLECTION`, `EMBEDDING_MODEL`,
    /// `FASTEMBED_CACHE_DIR`, `QDRANT_CONNECT_ATTEMPTS`, `QDRANT_RETRY_DELAY_SECS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        settings.qdrant = match get("QDRANT_URL") {
            Some(url) => QdrantConfig::new(url),
            None => {
                let host = get("QDRANT_HOST").unwrap_or_else(|| "localhost".to_string());
                let port = match get("QDRANT_PORT") {
                    Some(raw) => parse_number::<u16>("QDRANT_PORT", &raw)?,
                    None => 6333,
                };
                QdrantConfig::from_host_port(&host, port)
            }
        };
        if let Some(key) = get("QDRANT_API_KEY") {
            settings.qdrant = settings.qdrant.with_api_key(key);
        }

        if let Some(name) = get("PAPERS_COLLECTION") {
            settings.collection.name = name;
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            settings.embedding.model_name = model;
        }
        if let Some(dir) = get("FASTEMBED_CACHE_DIR") {
            settings.embedding.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = get("QDRANT_CONNECT_ATTEMPTS") {
            let attempts = parse_number::<u32>("QDRANT_CONNECT_ATTEMPTS", &raw)?;
            if attempts == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "QDRANT_CONNECT_ATTEMPTS",
                    value: raw,
                    reason: "must be at least 1".to_string(),
                });
            }
            settings.retry.max_attempts = attempts;
        }
        if let Some(raw) = get("QDRANT_RETRY_DELAY_SECS") {
            settings.retry.delay = Duration::from_secs(parse_number("QDRANT_RETRY_DELAY_SECS", &raw)?);
        }

        Ok(settings)
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings.qdrant.url, "http://localhost:6333");
        assert!(settings.qdrant.api_key.is_none());
        assert_eq!(settings.collection.name, "research_papers");
        assert_eq!(settings.collection.dimension, 384);
        assert_eq!(settings.embedding.model_name, "all-MiniLM-L6-v2");
        assert_eq!(settings.retry, RetryPolicy::new(5, Duration::from_secs(5)));
    }

    #[test]
    fn test_host_and_port() {
        let settings = load(&[("QDRANT_HOST", "qdrant"), ("QDRANT_PORT", "7000")]).unwrap();
        assert_eq!(settings.qdrant.url, "http://qdrant:7000");
    }

    #[test]
    fn test_url_wins_over_host() {
        let settings = load(&[
            ("QDRANT_URL", "https://cloud.example:6333"),
            ("QDRANT_HOST", "ignored"),
            ("QDRANT_API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(settings.qdrant.url, "https://cloud.example:6333");
        assert_eq!(settings.qdrant.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_overrides() {
        let settings = load(&[
            ("PAPERS_COLLECTION", "arxiv"),
            ("EMBEDDING_MODEL", "bge-small-en-v1.5"),
            ("FASTEMBED_CACHE_DIR", "/tmp/models"),
            ("QDRANT_CONNECT_ATTEMPTS", "2"),
            ("QDRANT_RETRY_DELAY_SECS", "1"),
        ])
        .unwrap();
        assert_eq!(settings.collection.name, "arxiv");
        assert_eq!(settings.embedding.model_name, "bge-small-en-v1.5");
        assert_eq!(settings.embedding.cache_dir, Some(PathBuf::from("/tmp/models")));
        assert_eq!(settings.retry, RetryPolicy::new(2, Duration::from_secs(1)));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let settings = load(&[("QDRANT_HOST", "  "), ("PAPERS_COLLECTION", "")]).unwrap();
        assert_eq!(settings.qdrant.url, "http://localhost:6333");
        assert_eq!(settings.collection.name, "research_papers");
    }

    #[test]
    fn test_invalid_numbers() {
        let err = load(&[("QDRANT_PORT", "not-a-port")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "QDRANT_PORT", .. }));

        let err = load(&[("QDRANT_CONNECT_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "QDRANT_CONNECT_ATTEMPTS", .. }
        ));
    }
}
