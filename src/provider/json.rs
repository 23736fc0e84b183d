//! JSON file provider.
//!
//! Reads either a JSON array of papers or JSON lines (one paper object per
//! line). Each object uses the same field names as the stored payload:
//! `title`, `abstract`, `authors`, `categories`, `publication_date`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{PaperProvider, ProviderError, ProviderResult};
use crate::models::PaperMetadata;

/// Papers loaded from a local JSON or JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonFilePaperProvider {
    path: PathBuf,
    name: String,
}

impl JsonFilePaperProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("json:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse file contents as a JSON array, falling back to JSON lines.
pub fn parse_papers(contents: &str) -> ProviderResult<Vec<PaperMetadata>> {
    let trimmed = contents.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| ProviderError::ParseError(format!("invalid JSON array: {}", e)));
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|e| ProviderError::ParseError(format!("line {}: {}", idx + 1, e)))
        })
        .collect()
}

#[async_trait]
impl PaperProvider for JsonFilePaperProvider {
    async fn fetch_papers(&self) -> ProviderResult<Vec<PaperMetadata>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let papers = parse_papers(&contents)?;
        debug!(path = %self.path.display(), count = papers.len(), "Loaded papers");
        Ok(papers)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
