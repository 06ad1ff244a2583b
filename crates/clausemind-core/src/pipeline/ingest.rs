//! Ingestion pipeline
//!
//! Orchestrates storage -> chunker -> embedder -> vector index for each
//! document. Per document the status moves pending -> chunked -> indexed,
//! or to failed with the reason preserved; a partially indexed document is
//! never exposed as a terminal state.

use crate::chunk::chunk_pages;
use crate::config::{ChunkingConfig, RetryConfig};
use crate::embed::Embedder;
use crate::error::{ClauseMindError, Result};
use crate::index::VectorIndex;
use crate::retry::with_retry;
use crate::storage::DocumentStorage;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Texts per embedding request
const EMBED_BATCH_SIZE: usize = 32;
/// Concurrent embedding requests per document
const EMBED_CONCURRENCY: usize = 4;

/// Processing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Chunked,
    Indexed,
    Failed,
}

/// Registry entry for an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub chunk_count: usize,
    /// Failure reason, kept for diagnostics when status is `failed`
    pub error: Option<String>,
}

/// Orchestrates chunking, embedding, and indexing of documents
pub struct IngestionPipeline {
    storage: Arc<dyn DocumentStorage>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunking: ChunkingConfig,
    retry: RetryConfig,
    registry: Arc<Mutex<HashMap<String, DocumentRecord>>>,
    /// One mutual-exclusion region per document id so concurrent ingestions
    /// of the same document serialize instead of interleaving writes
    doc_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl IngestionPipeline {
    pub fn new(
        storage: Arc<dyn DocumentStorage>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chunking: ChunkingConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            index,
            chunking,
            retry,
            registry: Arc::new(Mutex::new(HashMap::new())),
            doc_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Store raw bytes and ingest them synchronously
    pub async fn ingest_bytes(&self, filename: &str, bytes: &[u8]) -> Result<DocumentRecord> {
        let document_id = self.storage.store(filename, bytes).await?;
        self.register(&document_id, filename).await;
        self.ingest_document(&document_id).await
    }

    /// Store raw bytes and ingest in the background; the returned record is
    /// still `pending`
    pub async fn ingest_bytes_detached(
        self: &Arc<Self>,
        filename: &str,
        bytes: &[u8],
    ) -> Result<DocumentRecord> {
        let document_id = self.storage.store(filename, bytes).await?;
        self.register(&document_id, filename).await;

        let pipeline = Arc::clone(self);
        let id = document_id.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.ingest_document(&id).await {
                tracing::error!("background ingestion of {} failed: {}", id, e);
            }
        });

        self.document(&document_id)
            .await
            .ok_or_else(|| ClauseMindError::DocumentNotFound(document_id))
    }

    /// Run the full pipeline for an already-stored document.
    ///
    /// Re-ingesting an existing document id replaces its chunks and vector
    /// entries (delete-then-upsert), never accumulates duplicates.
    pub async fn ingest_document(&self, document_id: &str) -> Result<DocumentRecord> {
        let lock = self.lock_for(document_id).await;
        let _guard = lock.lock().await;

        // Documents stored out-of-band still get a registry entry
        if self.document(document_id).await.is_none() {
            self.register(document_id, document_id).await;
        }

        match self.run_stages(document_id).await {
            Ok(chunk_count) => {
                self.update(document_id, |r| {
                    r.status = DocumentStatus::Indexed;
                    r.chunk_count = chunk_count;
                    r.error = None;
                })
                .await;
                tracing::info!("indexed document {} ({} chunks)", document_id, chunk_count);
                self.document(document_id)
                    .await
                    .ok_or_else(|| ClauseMindError::DocumentNotFound(document_id.to_string()))
            }
            Err(e) => {
                self.update(document_id, |r| {
                    r.status = DocumentStatus::Failed;
                    r.error = Some(e.to_string());
                })
                .await;
                tracing::error!("ingestion of {} failed: {}", document_id, e);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, document_id: &str) -> Result<usize> {
        let pages = self.storage.fetch_text(document_id).await?;

        let chunks = chunk_pages(document_id, &pages, &self.chunking)?;
        self.update(document_id, |r| r.status = DocumentStatus::Chunked)
            .await;

        if chunks.is_empty() {
            // Nothing to index; an empty document is still a valid one
            self.index.delete(document_id).await?;
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embed_all(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(ClauseMindError::EmbeddingService {
                message: format!(
                    "{} embeddings for {} chunks",
                    embeddings.len(),
                    chunks.len()
                ),
                transient: false,
            });
        }

        let entries: Vec<_> = chunks.into_iter().zip(embeddings).collect();
        let count = entries.len();

        // Replace any previous version of this document before writing
        self.index.delete(document_id).await?;
        self.index.upsert(document_id, entries).await?;

        Ok(count)
    }

    /// Embed chunk texts in bounded batches, several batches in flight,
    /// reassembled in input order. Each batch retries independently.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<crate::embed::Embedding>> {
        let batches: Vec<(usize, Vec<String>)> = texts
            .chunks(EMBED_BATCH_SIZE)
            .map(|c| c.to_vec())
            .enumerate()
            .collect();
        let total = batches.len();

        let mut results: Vec<_> = stream::iter(batches)
            .map(|(idx, batch)| async move {
                tracing::debug!("embedding batch {}/{}", idx + 1, total);
                let result =
                    with_retry(&self.retry, || self.embedder.embed_batch(&batch)).await;
                (idx, result)
            })
            .buffer_unordered(EMBED_CONCURRENCY)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);

        let mut embeddings = Vec::with_capacity(texts.len());
        for (_, result) in results {
            embeddings.extend(result?);
        }
        Ok(embeddings)
    }

    /// Delete a document everywhere: index entries, stored bytes, registry.
    /// Idempotent; deleting an unknown document is not an error.
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let lock = self.lock_for(document_id).await;
        let _guard = lock.lock().await;

        self.index.delete(document_id).await?;
        self.storage.remove(document_id).await?;
        self.registry.lock().await.remove(document_id);
        self.doc_locks.lock().await.remove(document_id);
        Ok(())
    }

    /// All known documents, newest first
    pub async fn documents(&self) -> Vec<DocumentRecord> {
        let registry = self.registry.lock().await;
        let mut records: Vec<_> = registry.values().cloned().collect();
        records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        records
    }

    /// Look up one document record
    pub async fn document(&self, document_id: &str) -> Option<DocumentRecord> {
        self.registry.lock().await.get(document_id).cloned()
    }

    /// Seed the registry from previously persisted records
    pub async fn restore(&self, records: Vec<DocumentRecord>) {
        let mut registry = self.registry.lock().await;
        for record in records {
            registry.insert(record.document_id.clone(), record);
        }
    }

    async fn register(&self, document_id: &str, filename: &str) {
        let mut registry = self.registry.lock().await;
        registry.insert(
            document_id.to_string(),
            DocumentRecord {
                document_id: document_id.to_string(),
                filename: filename.to_string(),
                uploaded_at: Utc::now(),
                status: DocumentStatus::Pending,
                chunk_count: 0,
                error: None,
            },
        );
    }

    async fn update(&self, document_id: &str, f: impl FnOnce(&mut DocumentRecord)) {
        let mut registry = self.registry.lock().await;
        if let Some(record) = registry.get_mut(document_id) {
            f(record);
        }
    }

    async fn lock_for(&self, document_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.doc_locks.lock().await;
        Arc::clone(locks.entry(document_id.to_string()).or_default())
    }
}
