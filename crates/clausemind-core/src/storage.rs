//! Document storage
//!
//! Narrow interface over wherever the raw documents live. The local
//! implementation keeps uploaded bytes on disk under a content-addressed id
//! and extracts page text on demand (PDF via `pdf-extract`, anything else
//! treated as UTF-8 text).

use crate::error::{ClauseMindError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Extracted page texts of a document, in page order
pub type DocumentPages = Vec<String>;

/// Storage collaborator for raw document bytes and their extracted text
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Store bytes under a stable, content-derived document id
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String>;

    /// Fetch the extracted page texts for a stored document
    async fn fetch_text(&self, document_id: &str) -> Result<DocumentPages>;

    /// Remove a stored document (no-op when absent)
    async fn remove(&self, document_id: &str) -> Result<()>;
}

/// Stable document id from content bytes (sha256 prefix)
pub fn document_id_for(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_prefix(&digest, 16)
}

fn hex_prefix(digest: &[u8], len: usize) -> String {
    digest
        .iter()
        .take(len)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Filesystem-backed document storage
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create storage rooted at the given directory, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, document_id: &str) -> Result<PathBuf> {
        // Ids are hex strings; reject anything that could escape the root
        if document_id.is_empty()
            || !document_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ClauseMindError::InvalidInput(format!(
                "malformed document id '{}'",
                document_id
            )));
        }
        Ok(self.root.join(document_id))
    }

    fn find_stored(&self, document_id: &str) -> Result<Option<PathBuf>> {
        let base = self.path_for(document_id)?;
        for ext in ["pdf", "txt"] {
            let candidate = base.with_extension(ext);
            if candidate.exists() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    fn extract_pdf_pages(bytes: &[u8]) -> Result<DocumentPages> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ClauseMindError::Extraction(format!("PDF extraction failed: {}", e)))?;

        if text.trim().is_empty() {
            return Err(ClauseMindError::Extraction(
                "PDF contains no extractable text (may be image-based)".to_string(),
            ));
        }

        // pdf-extract separates pages with form feeds
        Ok(text
            .split('\u{c}')
            .map(str::to_string)
            .filter(|p| !p.trim().is_empty())
            .collect())
    }
}

#[async_trait]
impl DocumentStorage for LocalStorage {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let document_id = document_id_for(bytes);
        let ext = if filename.to_lowercase().ends_with(".pdf") {
            "pdf"
        } else {
            "txt"
        };
        let path = self.path_for(&document_id)?.with_extension(ext);

        tokio::fs::write(&path, bytes).await?;
        tracing::info!("stored '{}' as document {}", filename, document_id);
        Ok(document_id)
    }

    async fn fetch_text(&self, document_id: &str) -> Result<DocumentPages> {
        let path = self
            .find_stored(document_id)?
            .ok_or_else(|| ClauseMindError::DocumentNotFound(document_id.to_string()))?;

        let bytes = tokio::fs::read(&path).await?;

        if path.extension().is_some_and(|e| e == "pdf") {
            // pdf-extract is synchronous and can be slow on large files
            tokio::task::spawn_blocking(move || Self::extract_pdf_pages(&bytes))
                .await
                .map_err(|e| ClauseMindError::Extraction(format!("extraction task failed: {}", e)))?
        } else {
            let text = String::from_utf8(bytes).map_err(|e| {
                ClauseMindError::Extraction(format!("document is not valid UTF-8: {}", e))
            })?;
            Ok(vec![text])
        }
    }

    async fn remove(&self, document_id: &str) -> Result<()> {
        if let Some(path) = self.find_stored(document_id)? {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }
}
