//! End-to-end pipeline tests with mock inference providers.
//!
//! The embedder projects text onto keyword axes so similarity behaves
//! plausibly without any network; the reasoning client replays scripted
//! responses and counts invocations.

use async_trait::async_trait;
use clausemind_core::{
    ChatMessage, ChunkingConfig, ClauseMindError, Decision, DecisionSynthesizer, DocumentStatus,
    Embedder, Embedding, EntityExtractor, IngestionPipeline, LocalStorage, MemoryVectorIndex,
    QueryPipeline, ReasoningClient, Result, RetrievalConfig, Retriever, RetryConfig, VectorIndex,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const AXES: &[&[&str]] = &[
    &["dental", "eligible", "eligibility", "18", "age"],
    &["premium", "payment", "monthly"],
    &["waiting", "period", "days"],
    &["hospital", "surgery", "claim"],
];

/// Deterministic keyword-axis embedder
struct MockEmbedder {
    calls: AtomicUsize,
    transient_failures: AtomicUsize,
}

impl MockEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            transient_failures: AtomicUsize::new(0),
        })
    }

    /// Fail the next `n` calls with a transient error
    fn fail_transiently(self: &Arc<Self>, n: usize) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = AXES
            .iter()
            .map(|axis| axis.iter().filter(|kw| lower.contains(*kw)).count() as f32)
            .collect();
        // Bias the last axis so no vector is all-zero
        v.push(1.0);
        v
    }

    fn take_failure(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 {
                    Some(n - 1)
                } else {
                    None
                }
            })
            .is_ok()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(ClauseMindError::EmbeddingService {
                message: "simulated rate limit".to_string(),
                transient: true,
            });
        }
        Ok(Embedding {
            vector: Self::vector_for(text),
            model: "mock-embed".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(ClauseMindError::EmbeddingService {
                message: "simulated rate limit".to_string(),
                transient: true,
            });
        }
        Ok(texts
            .iter()
            .map(|t| Embedding {
                vector: Self::vector_for(t),
                model: "mock-embed".to_string(),
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        AXES.len() + 1
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

/// Replays scripted responses, counting invocations
struct ScriptedReasoning {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedReasoning {
    fn new(responses: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningClient for ScriptedReasoning {
    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ClauseMindError::ReasoningService {
                message: "script exhausted".to_string(),
                transient: false,
            });
        }
        Ok(responses.remove(0))
    }

    fn model_name(&self) -> &str {
        "mock-reasoning"
    }
}

const ELIGIBILITY_TEXT: &str =
    "The policyholder must be at least 18 years old to file a claim for dental procedures.";

fn retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay_ms: 1,
    }
}

fn chunking() -> ChunkingConfig {
    ChunkingConfig {
        chunk_size: 50,
        chunk_overlap: 10,
    }
}

struct Harness {
    _dir: TempDir,
    embedder: Arc<MockEmbedder>,
    ingestion: Arc<IngestionPipeline>,
    index: Arc<MemoryVectorIndex>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).unwrap());
        let embedder = MockEmbedder::new();
        let index = Arc::new(MemoryVectorIndex::new());
        let ingestion = Arc::new(IngestionPipeline::new(
            storage,
            embedder.clone(),
            index.clone(),
            chunking(),
            retry(),
        ));
        Self {
            _dir: dir,
            embedder,
            ingestion,
            index,
        }
    }

    fn query_pipeline(&self, reasoning: Arc<ScriptedReasoning>) -> QueryPipeline {
        let retriever = Arc::new(Retriever::new(
            self.embedder.clone(),
            self.index.clone(),
            RetrievalConfig::default(),
            retry(),
        ));
        let synthesizer = Arc::new(DecisionSynthesizer::new(reasoning, retry()));
        QueryPipeline::new(
            Arc::new(EntityExtractor::rule_based()),
            retriever,
            synthesizer,
        )
    }
}

#[tokio::test]
async fn ingest_then_query_rejects_underage_dental_claim() {
    let harness = Harness::new();

    let record = harness
        .ingestion
        .ingest_bytes("policy.txt", ELIGIBILITY_TEXT.as_bytes())
        .await
        .unwrap();
    assert_eq!(record.status, DocumentStatus::Indexed);
    assert!(record.chunk_count >= 1);

    let reasoning = ScriptedReasoning::new(vec![
        r#"{"decision": "rejected", "justification": "Clause [C1] requires a minimum age of 18; the claimant is 16.", "citations": ["C1"], "confidence": 0.9}"#,
    ]);
    let pipeline = harness.query_pipeline(reasoning.clone());

    let response = pipeline
        .answer("Is a 16-year-old eligible for a dental claim?", None, None)
        .await
        .unwrap();

    // Rule-based extraction found the structured attributes
    assert_eq!(
        response.entities.get("age"),
        Some(&serde_json::Value::from(16))
    );
    assert_eq!(
        response.entities.get("procedure"),
        Some(&serde_json::Value::from("dental"))
    );

    // The eligibility clause was retrieved and cited
    assert!(!response.retrieved.is_empty());
    assert!(response
        .retrieved
        .iter()
        .any(|s| s.chunk.text.contains("18 years old")));

    assert_eq!(response.decision.decision, Decision::Rejected);
    assert!(!response.decision.cited_chunks.is_empty());
    for cited in &response.decision.cited_chunks {
        assert!(response
            .retrieved
            .iter()
            .any(|s| s.chunk.id() == *cited));
    }
    assert_eq!(reasoning.call_count(), 1);
}

#[tokio::test]
async fn delete_then_scoped_query_returns_needs_more_info() {
    let harness = Harness::new();

    let record = harness
        .ingestion
        .ingest_bytes("policy.txt", ELIGIBILITY_TEXT.as_bytes())
        .await
        .unwrap();
    harness
        .ingestion
        .delete_document(&record.document_id)
        .await
        .unwrap();

    // No canned response: the reasoning provider must not be called
    let reasoning = ScriptedReasoning::new(vec![]);
    let pipeline = harness.query_pipeline(reasoning.clone());

    let response = pipeline
        .answer(
            "Is a 16-year-old eligible for a dental claim?",
            Some(vec![record.document_id.clone()]),
            None,
        )
        .await
        .unwrap();

    assert!(response.retrieved.is_empty());
    assert_eq!(response.decision.decision, Decision::NeedsMoreInfo);
    assert_eq!(reasoning.call_count(), 0);
}

#[tokio::test]
async fn transient_embedding_failures_are_retried_to_success() {
    let harness = Harness::new();
    harness.embedder.fail_transiently(2);

    let record = harness
        .ingestion
        .ingest_bytes("policy.txt", ELIGIBILITY_TEXT.as_bytes())
        .await
        .unwrap();

    assert_eq!(record.status, DocumentStatus::Indexed);
    // Two transient failures plus the success
    assert_eq!(harness.embedder.call_count(), 3);
}

#[tokio::test]
async fn reingesting_replaces_instead_of_duplicating() {
    let harness = Harness::new();

    let first = harness
        .ingestion
        .ingest_bytes("policy.txt", ELIGIBILITY_TEXT.as_bytes())
        .await
        .unwrap();
    let second = harness
        .ingestion
        .ingest_bytes("policy.txt", ELIGIBILITY_TEXT.as_bytes())
        .await
        .unwrap();

    assert_eq!(first.document_id, second.document_id);
    let stats = harness.index.stats().await.unwrap();
    assert_eq!(stats.entry_count, second.chunk_count);
    assert_eq!(stats.document_count, 1);
}

#[tokio::test]
async fn failed_ingestion_preserves_reason() {
    let harness = Harness::new();

    // A PDF with garbage bytes fails text extraction
    let record = harness
        .ingestion
        .ingest_bytes("broken.pdf", b"not really a pdf")
        .await;
    assert!(record.is_err());

    let documents = harness.ingestion.documents().await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].status, DocumentStatus::Failed);
    assert!(documents[0].error.is_some());
}

#[tokio::test]
async fn concurrent_ingestions_of_same_document_serialize() {
    let harness = Harness::new();

    let id = {
        let record = harness
            .ingestion
            .ingest_bytes("policy.txt", ELIGIBILITY_TEXT.as_bytes())
            .await
            .unwrap();
        record.document_id
    };

    let a = harness.ingestion.ingest_document(&id);
    let b = harness.ingestion.ingest_document(&id);
    let (ra, rb) = tokio::join!(a, b);
    ra.unwrap();
    rb.unwrap();

    let stats = harness.index.stats().await.unwrap();
    assert_eq!(stats.document_count, 1);
    let record = harness.ingestion.document(&id).await.unwrap();
    assert_eq!(stats.entry_count, record.chunk_count);
}

#[tokio::test]
async fn batch_embedding_matches_single_calls() {
    let embedder = MockEmbedder::new();
    let texts = vec![
        "dental eligibility clause".to_string(),
        "monthly premium payment".to_string(),
    ];
    let batch = embedder.embed_batch(&texts).await.unwrap();
    for (text, from_batch) in texts.iter().zip(&batch) {
        let single = embedder.embed(text).await.unwrap();
        assert_eq!(single.vector, from_batch.vector);
        assert_eq!(single.model, from_batch.model);
    }
}
