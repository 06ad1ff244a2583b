//! In-process vector index
//!
//! Entries live in a `RwLock`-guarded map keyed by document id. Mutations
//! take the write lock, so a query racing a delete observes either the full
//! pre-delete set or none of the document's entries, never a partial batch.

use super::{cosine_similarity, IndexFilter, IndexStats, ScoredChunk, VectorIndex};
use crate::chunk::Chunk;
use crate::embed::Embedding;
use crate::error::{ClauseMindError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

#[derive(Serialize, Deserialize)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Embedding,
}

/// In-memory nearest-neighbor index over model-tagged embeddings
#[derive(Default)]
pub struct MemoryVectorIndex {
    entries: RwLock<HashMap<String, Vec<IndexEntry>>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_model(stored: &str, incoming: &str) -> Result<()> {
        if stored != incoming {
            return Err(ClauseMindError::ModelMismatch {
                expected: stored.to_string(),
                actual: incoming.to_string(),
            });
        }
        Ok(())
    }

    /// Load a previously saved snapshot; a missing file yields an empty index
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let map: HashMap<String, Vec<IndexEntry>> = serde_json::from_str(&content)?;
        Ok(Self {
            entries: RwLock::new(map),
        })
    }

    /// Persist the index contents to disk as JSON
    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let map = self.entries.read().await;
        let content = serde_json::to_string(&*map)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, document_id: &str, entries: Vec<(Chunk, Embedding)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        // Validate the whole batch before touching the map so a failed
        // upsert leaves no partial state behind.
        let batch_model = entries[0].1.model.clone();
        for (chunk, embedding) in &entries {
            Self::check_model(&batch_model, &embedding.model)?;
            if chunk.document_id != document_id {
                return Err(ClauseMindError::InvalidInput(format!(
                    "chunk belongs to document '{}', upsert targets '{}'",
                    chunk.document_id, document_id
                )));
            }
        }

        let mut map = self.entries.write().await;

        if let Some(existing) = map.values().flatten().next() {
            Self::check_model(&existing.embedding.model, &batch_model)?;
        }

        let doc_entries = map.entry(document_id.to_string()).or_default();
        for (chunk, embedding) in entries {
            // Replace by chunk identity rather than duplicating
            match doc_entries.iter_mut().find(|e| e.chunk.seq == chunk.seq) {
                Some(slot) => *slot = IndexEntry { chunk, embedding },
                None => doc_entries.push(IndexEntry { chunk, embedding }),
            }
        }
        doc_entries.sort_by_key(|e| e.chunk.seq);

        Ok(())
    }

    async fn query(
        &self,
        embedding: &Embedding,
        k: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let map = self.entries.read().await;

        let mut scored: Vec<ScoredChunk> = Vec::new();
        for (document_id, doc_entries) in map.iter() {
            if !filter.matches(document_id) {
                continue;
            }
            for entry in doc_entries {
                Self::check_model(&entry.embedding.model, &embedding.model)?;
                let score = cosine_similarity(&entry.embedding.vector, &embedding.vector);
                scored.push(ScoredChunk {
                    chunk: entry.chunk.clone(),
                    score,
                });
            }
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.seq.cmp(&b.chunk.seq))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn delete(&self, document_id: &str) -> Result<()> {
        let mut map = self.entries.write().await;
        if map.remove(document_id).is_none() {
            tracing::debug!("delete for unindexed document '{}' is a no-op", document_id);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let map = self.entries.read().await;
        let first = map.values().flatten().next();
        Ok(IndexStats {
            document_count: map.len(),
            entry_count: map.values().map(|v| v.len()).sum(),
            model: first.map(|e| e.embedding.model.clone()),
            dimensions: first.map(|e| e.embedding.vector.len()),
        })
    }

    async fn document_ids(&self) -> Result<Vec<String>> {
        let map = self.entries.read().await;
        let mut ids: Vec<String> = map.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn chunk(document_id: &str, seq: u32, text: &str) -> Chunk {
        Chunk {
            document_id: document_id.to_string(),
            seq,
            text: text.to_string(),
            span: (0, text.len()),
            page: None,
        }
    }

    fn embedding(vector: Vec<f32>) -> Embedding {
        Embedding {
            vector,
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_chunk_identity() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("doc", vec![(chunk("doc", 0, "v1"), embedding(vec![1.0, 0.0]))])
            .await
            .unwrap();
        index
            .upsert("doc", vec![(chunk("doc", 0, "v2"), embedding(vec![0.0, 1.0]))])
            .await
            .unwrap();

        let stats = index.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);

        let results = index
            .query(&embedding(vec![0.0, 1.0]), 5, &IndexFilter::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "v2");
        assert!((results[0].score - 1.0).abs() < 0.0001);
    }

    #[tokio::test]
    async fn test_query_bounded_and_sorted() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                "doc",
                vec![
                    (chunk("doc", 0, "a"), embedding(vec![1.0, 0.0])),
                    (chunk("doc", 1, "b"), embedding(vec![0.9, 0.1])),
                    (chunk("doc", 2, "c"), embedding(vec![0.0, 1.0])),
                ],
            )
            .await
            .unwrap();

        let results = index
            .query(&embedding(vec![1.0, 0.0]), 2, &IndexFilter::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[0].chunk.text, "a");
    }

    #[tokio::test]
    async fn test_ties_broken_by_sequence_index() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                "doc",
                vec![
                    (chunk("doc", 3, "later"), embedding(vec![1.0, 0.0])),
                    (chunk("doc", 1, "earlier"), embedding(vec![1.0, 0.0])),
                ],
            )
            .await
            .unwrap();

        let results = index
            .query(&embedding(vec![1.0, 0.0]), 2, &IndexFilter::default())
            .await
            .unwrap();
        assert_eq!(results[0].chunk.seq, 1);
        assert_eq!(results[1].chunk.seq, 3);
    }

    #[tokio::test]
    async fn test_document_scoped_query() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("a", vec![(chunk("a", 0, "in a"), embedding(vec![1.0, 0.0]))])
            .await
            .unwrap();
        index
            .upsert("b", vec![(chunk("b", 0, "in b"), embedding(vec![1.0, 0.0]))])
            .await
            .unwrap();

        let filter = IndexFilter::for_documents(Some(vec!["b".to_string()]));
        let results = index
            .query(&embedding(vec![1.0, 0.0]), 10, &filter)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.document_id, "b");
    }

    #[tokio::test]
    async fn test_delete_is_silent_noop_when_absent() {
        let index = MemoryVectorIndex::new();
        index.delete("never-indexed").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_then_scoped_query_is_empty() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("doc", vec![(chunk("doc", 0, "x"), embedding(vec![1.0]))])
            .await
            .unwrap();
        index.delete("doc").await.unwrap();

        let filter = IndexFilter::for_documents(Some(vec!["doc".to_string()]));
        let results = index.query(&embedding(vec![1.0]), 5, &filter).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(index.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_query_racing_delete_sees_all_or_nothing() {
        let index = Arc::new(MemoryVectorIndex::new());
        let entries: Vec<_> = (0..64)
            .map(|i| (chunk("doc", i, "clause"), embedding(vec![1.0, 0.0])))
            .collect();
        let total = entries.len();
        index.upsert("doc", entries).await.unwrap();

        let reader = {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                let mut observed = Vec::new();
                for _ in 0..50 {
                    let results = index
                        .query(&embedding(vec![1.0, 0.0]), total, &IndexFilter::default())
                        .await
                        .unwrap();
                    observed.push(results.len());
                    tokio::task::yield_now().await;
                }
                observed
            })
        };
        let deleter = {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                index.delete("doc").await.unwrap();
            })
        };

        let (observed, deleted) = tokio::join!(reader, deleter);
        deleted.unwrap();
        for len in observed.unwrap() {
            // Either the full pre-delete set or nothing, never a partial view
            assert!(len == total || len == 0, "saw partial result set: {}", len);
        }
        assert_eq!(index.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.json");

        let index = MemoryVectorIndex::new();
        index
            .upsert("doc", vec![(chunk("doc", 0, "clause"), embedding(vec![1.0, 0.0]))])
            .await
            .unwrap();
        index.save_snapshot(&path).await.unwrap();

        let restored = MemoryVectorIndex::load_snapshot(&path).unwrap();
        let results = restored
            .query(&embedding(vec![1.0, 0.0]), 5, &IndexFilter::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "clause");

        // Missing snapshot file is an empty index, not an error
        let empty = MemoryVectorIndex::load_snapshot(&dir.path().join("missing.json")).unwrap();
        assert_eq!(empty.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_cross_model_query_is_rejected() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("doc", vec![(chunk("doc", 0, "x"), embedding(vec![1.0]))])
            .await
            .unwrap();

        let other = Embedding {
            vector: vec![1.0],
            model: "other-model".to_string(),
        };
        let err = index
            .query(&other, 5, &IndexFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClauseMindError::ModelMismatch { .. }));
    }

    #[tokio::test]
    async fn test_mixed_model_batch_is_rejected_atomically() {
        let index = MemoryVectorIndex::new();
        let err = index
            .upsert(
                "doc",
                vec![
                    (chunk("doc", 0, "x"), embedding(vec![1.0])),
                    (
                        chunk("doc", 1, "y"),
                        Embedding {
                            vector: vec![1.0],
                            model: "other-model".to_string(),
                        },
                    ),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClauseMindError::ModelMismatch { .. }));
        assert_eq!(index.stats().await.unwrap().entry_count, 0);
    }
}
