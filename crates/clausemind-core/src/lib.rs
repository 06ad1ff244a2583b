//! ClauseMind Core Library
//!
//! Retrieval-augmented decision making over insurance documents:
//! - Deterministic overlap-aware chunking
//! - Model-tagged embeddings via external inference services
//! - Cosine-similarity vector index with document-scoped queries
//! - Entity extraction from natural-language queries (LLM with rule fallback)
//! - Evidence-grounded decision synthesis with validated citations

pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod retrieve;
pub mod retry;
pub mod storage;
pub mod synthesize;

pub use chunk::{chunk_pages, chunk_text, Chunk, ChunkId};
pub use config::{
    ChunkingConfig, Config, EmbeddingServiceConfig, ReasoningServiceConfig, RetrievalConfig,
    RetryConfig,
};
pub use embed::{Embedder, Embedding, HttpEmbedder};
pub use error::{ClauseMindError, Error, Result};
pub use index::{cosine_similarity, IndexFilter, IndexStats, MemoryVectorIndex, ScoredChunk, VectorIndex};
pub use llm::{
    extract_with_rules, ChatMessage, EntityExtractor, ExtractedEntities, HttpReasoningClient,
    ReasoningClient, ENTITY_VOCABULARY,
};
pub use pipeline::{DocumentRecord, DocumentStatus, IngestionPipeline, QueryPipeline, QueryResponse};
pub use retrieve::Retriever;
pub use retry::with_retry;
pub use storage::{document_id_for, DocumentPages, DocumentStorage, LocalStorage};
pub use synthesize::{Decision, DecisionResult, DecisionSynthesizer};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "clausemind";

/// Default data directory name
pub const DATA_DIR_NAME: &str = "clausemind";
