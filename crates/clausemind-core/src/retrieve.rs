//! Top-K clause retrieval
//!
//! Embeds the query, runs the vector index query, then re-ranks with
//! extracted entities. Entity boosting only ever adds score; if a later
//! filtering step would empty the candidate set, the unranked top-K stands.

use crate::config::{RetrievalConfig, RetryConfig};
use crate::embed::Embedder;
use crate::error::Result;
use crate::index::{IndexFilter, ScoredChunk, VectorIndex};
use crate::llm::ExtractedEntities;
use crate::retry::with_retry;
use std::sync::Arc;

/// Retrieves the most relevant chunks for a query
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
    retry: RetryConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
            retry,
        }
    }

    /// Caller-supplied top_k is clamped into [1, max_top_k], never rejected.
    /// A misconfigured ceiling of 0 is treated as 1 rather than panicking.
    fn effective_top_k(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.top_k)
            .clamp(1, self.config.max_top_k.max(1))
    }

    /// Retrieve the top-K chunks for a query, optionally scoped to a
    /// document set and re-ranked by extracted entities.
    pub async fn retrieve(
        &self,
        query: &str,
        entities: &ExtractedEntities,
        document_ids: Option<Vec<String>>,
        top_k: Option<usize>,
    ) -> Result<Vec<ScoredChunk>> {
        let k = self.effective_top_k(top_k);

        let query_embedding =
            with_retry(&self.retry, || self.embedder.embed(query)).await?;

        let filter = IndexFilter::for_documents(document_ids);
        let candidates = self.index.query(&query_embedding, k, &filter).await?;

        tracing::debug!(
            "retrieved {} candidates for query (k={})",
            candidates.len(),
            k
        );

        Ok(self.apply_entities(candidates, entities))
    }

    /// Boost chunks whose text contains a matching entity value, then
    /// re-sort. Additive only, so the candidate set can never empty out.
    pub fn apply_entities(
        &self,
        mut chunks: Vec<ScoredChunk>,
        entities: &ExtractedEntities,
    ) -> Vec<ScoredChunk> {
        let needles: Vec<String> = entities
            .values_as_text()
            .into_iter()
            .map(|v| v.to_lowercase())
            .collect();

        if needles.is_empty() {
            return chunks;
        }

        for scored in &mut chunks {
            let haystack = scored.chunk.text.to_lowercase();
            let matches = needles.iter().filter(|n| haystack.contains(*n)).count();
            scored.score += self.config.entity_boost * matches as f32;
        }

        chunks.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.seq.cmp(&b.chunk.seq))
        });
        chunks
    }
}
