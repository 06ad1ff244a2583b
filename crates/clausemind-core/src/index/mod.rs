//! Vector index
//!
//! Stores (chunk, embedding) pairs per document and answers nearest-neighbor
//! queries by cosine similarity. Vectors from different embedding models are
//! never compared against each other.

mod memory;

pub use memory::MemoryVectorIndex;

use crate::chunk::Chunk;
use crate::embed::Embedding;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chunk with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Optional scoping of a query to a document set
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub document_ids: Option<Vec<String>>,
}

impl IndexFilter {
    pub fn for_documents(document_ids: Option<Vec<String>>) -> Self {
        Self { document_ids }
    }

    fn matches(&self, document_id: &str) -> bool {
        match &self.document_ids {
            Some(ids) => ids.iter().any(|id| id == document_id),
            None => true,
        }
    }
}

/// Index statistics for introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub entry_count: usize,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
}

/// Nearest-neighbor store over model-tagged embeddings
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries for a document. Idempotent by chunk
    /// identity; all-or-nothing per batch.
    async fn upsert(&self, document_id: &str, entries: Vec<(Chunk, Embedding)>) -> Result<()>;

    /// Top-k most similar chunks, descending by score, ties broken by chunk
    /// sequence index ascending. Returns at most `k` results.
    async fn query(
        &self,
        embedding: &Embedding,
        k: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<ScoredChunk>>;

    /// Remove all entries for a document. No-op when the document was never
    /// indexed.
    async fn delete(&self, document_id: &str) -> Result<()>;

    /// Index statistics
    async fn stats(&self) -> Result<IndexStats>;

    /// Ids of all indexed documents
    async fn document_ids(&self) -> Result<Vec<String>>;
}

/// Cosine similarity between two vectors (0.0 for mismatched or zero-norm input)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
