//! Query pipeline
//!
//! Stateless per query: entity extraction and raw-query retrieval run
//! concurrently (they are independent given the query text), then the
//! synthesizer turns the evidence into a cited decision.

use crate::error::{ClauseMindError, Result};
use crate::index::ScoredChunk;
use crate::llm::{EntityExtractor, ExtractedEntities};
use crate::retrieve::Retriever;
use crate::synthesize::{DecisionResult, DecisionSynthesizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything produced for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub decision: DecisionResult,
    pub entities: ExtractedEntities,
    pub retrieved: Vec<ScoredChunk>,
}

/// Orchestrates extractor -> retriever -> synthesizer for one question
pub struct QueryPipeline {
    extractor: Arc<EntityExtractor>,
    retriever: Arc<Retriever>,
    synthesizer: Arc<DecisionSynthesizer>,
}

impl QueryPipeline {
    pub fn new(
        extractor: Arc<EntityExtractor>,
        retriever: Arc<Retriever>,
        synthesizer: Arc<DecisionSynthesizer>,
    ) -> Self {
        Self {
            extractor,
            retriever,
            synthesizer,
        }
    }

    /// Answer a question against the indexed documents.
    ///
    /// Entity extraction is an enrichment: it runs concurrently with the
    /// initial retrieval and its output only re-ranks the candidates.
    pub async fn answer(
        &self,
        query: &str,
        document_ids: Option<Vec<String>>,
        top_k: Option<usize>,
    ) -> Result<QueryResponse> {
        if query.trim().is_empty() {
            return Err(ClauseMindError::InvalidInput(
                "query must not be empty".to_string(),
            ));
        }

        let no_entities = ExtractedEntities::default();
        let (entities, retrieved) = tokio::join!(
            self.extractor.extract(query),
            self.retriever
                .retrieve(query, &no_entities, document_ids, top_k)
        );
        let retrieved = retrieved?;

        // Entities arrived after the index query; apply them as a re-rank
        let retrieved = self.retriever.apply_entities(retrieved, &entities);

        let decision = self
            .synthesizer
            .synthesize(query, &entities, &retrieved)
            .await?;

        Ok(QueryResponse {
            decision,
            entities,
            retrieved,
        })
    }
}
