//! Core data models for the research hub.
//!
//! This module contains the record stored alongside every paper vector and the
//! two projections returned by search: the full [`SearchResult`] used for text
//! search and the reduced [`SimilarPaper`] used for similarity-by-id lookups.

use serde::{Deserialize, Deserializer, Serialize};

/// Metadata payload stored with each paper vector.
///
/// A stored payload may lack any field or hold `null` for it; both decode to
/// an empty string or empty list. `authors` and `categories` also accept a
/// single string in place of a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaperMetadata {
    /// Paper title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Abstract text
    #[serde(default, rename = "abstract", deserialize_with = "null_as_default")]
    pub abstract_text: String,

    /// Authors in the order they appear on the paper
    #[serde(default, deserialize_with = "one_or_many")]
    pub authors: Vec<String>,

    /// Subject categories (e.g. "cs.AI"); used for filtered search
    #[serde(default, deserialize_with = "one_or_many")]
    pub categories: Vec<String>,

    /// Publication date as supplied by the caller
    #[serde(default, deserialize_with = "null_as_default")]
    pub publication_date: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        // null entries inside a list are dropped
        Some(OneOrMany::Many(values)) => values.into_iter().flatten().collect(),
    })
}

impl PaperMetadata {
    /// Text that represents this paper for embedding: title followed by abstract.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title.trim(), self.abstract_text.trim())
            .trim()
            .to_string()
    }

    /// Check whether the paper is tagged with `category`.
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// A single text-search hit with the full metadata projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// Identifier of the stored paper
    pub id: String,

    /// Similarity score (higher is more similar)
    pub score: f32,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub authors: Vec<String>,

    pub categories: Vec<String>,
}

impl SearchResult {
    /// Project a stored paper into a search hit.
    pub fn from_metadata(id: String, score: f32, metadata: PaperMetadata) -> Self {
        Self {
            id,
            score,
            title: metadata.title,
            abstract_text: metadata.abstract_text,
            authors: metadata.authors,
            categories: metadata.categories,
        }
    }
}

/// A similarity-by-id hit with the reduced projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarPaper {
    pub id: String,
    pub score: f32,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl SimilarPaper {
    pub fn from_metadata(id: String, score: f32, metadata: PaperMetadata) -> Self {
        Self {
            id,
            score,
            title: metadata.title,
            abstract_text: metadata.abstract_text,
        }
    }
}

/// Configuration of the embedding model feeding a collection.
///
/// Collections are created with the generator's dimension, so both sides
/// must agree on it for the lifetime of the collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Name of the embedding model (e.g., "all-MiniLM-L6-v2")
    pub model_name: String,

    /// Dimension of the embedding vectors
    pub dimension: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_payload_fields_default_to_empty() {
        let metadata: PaperMetadata = serde_json::from_str(r#"{"title": "Only a title"}"#).unwrap();
        assert_eq!(metadata.title, "Only a title");
        assert!(metadata.abstract_text.is_empty());
        assert!(metadata.authors.is_empty());
        assert!(metadata.categories.is_empty());
        assert!(metadata.publication_date.is_empty());
    }

    #[test]
    fn test_null_payload_fields_default_to_empty() {
        let metadata: PaperMetadata = serde_json::from_str(
            r#"{"title": null, "abstract": null, "authors": null, "categories": null, "publication_date": null}"#,
        )
        .unwrap();
        assert_eq!(metadata, PaperMetadata::default());
    }

    #[test]
    fn test_single_string_lists() {
        let metadata: PaperMetadata = serde_json::from_str(
            r#"{"title": "T", "authors": "Ada Lovelace", "categories": "cs.AI"}"#,
        )
        .unwrap();
        assert_eq!(metadata.authors, vec!["Ada Lovelace"]);
        assert!(metadata.has_category("cs.AI"));

        let metadata: PaperMetadata =
            serde_json::from_str(r#"{"categories": ["cs.OS", null, "cs.DC"]}"#).unwrap();
        assert_eq!(metadata.categories, vec!["cs.OS", "cs.DC"]);
    }

    #[test]
    fn test_wrong_field_type_still_fails() {
        assert!(serde_json::from_str::<PaperMetadata>(r#"{"authors": 42}"#).is_err());
    }

    #[test]
    fn test_abstract_uses_wire_name() {
        let metadata = PaperMetadata {
            title: "A".to_string(),
            abstract_text: "about kernels".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["abstract"], "about kernels");
        assert!(json.get("abstract_text").is_none());
    }

    #[test]
    fn test_embedding_text_combines_title_and_abstract() {
        let metadata = PaperMetadata {
            title: "  Attention Is All You Need ".to_string(),
            abstract_text: "We propose the Transformer.".to_string(),
            ..Default::default()
        };
        assert_eq!(
            metadata.embedding_text(),
            "Attention Is All You Need We propose the Transformer."
        );

        let untitled = PaperMetadata {
            abstract_text: "Abstract only".to_string(),
            ..Default::default()
        };
        assert_eq!(untitled.embedding_text(), "Abstract only");
        assert_eq!(PaperMetadata::default().embedding_text(), "");
    }

    #[test]
    fn test_has_category() {
        let metadata = PaperMetadata {
            categories: vec!["cs.OS".to_string(), "cs.DC".to_string()],
            ..Default::default()
        };
        assert!(metadata.has_category("cs.OS"));
        assert!(!metadata.has_category("cs.AI"));
    }

    #[test]
    fn test_projections() {
        let metadata = PaperMetadata {
            title: "A".to_string(),
            abstract_text: "about kernels".to_string(),
            authors: vec!["X".to_string()],
            categories: vec!["cs.OS".to_string()],
            publication_date: "2024-01-01".to_string(),
        };

        let hit = SearchResult::from_metadata("id-1".to_string(), 0.9, metadata.clone());
        assert_eq!(hit.authors, vec!["X"]);
        assert_eq!(hit.categories, vec!["cs.OS"]);

        let similar = SimilarPaper::from_metadata("id-1".to_string(), 0.9, metadata);
        assert_eq!(similar.title, "A");
        assert_eq!(similar.abstract_text, "about kernels");
    }
}
