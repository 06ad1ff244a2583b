//! Component wiring for the CLI process
//!
//! Builds every core component from one `Config`, restores the index and
//! document registry from disk, and persists them after mutating commands.

use clausemind_core::{
    Config, DecisionSynthesizer, DocumentRecord, EntityExtractor, HttpEmbedder,
    HttpReasoningClient, IngestionPipeline, LocalStorage, MemoryVectorIndex, QueryPipeline,
    Result, Retriever,
};
use std::path::PathBuf;
use std::sync::Arc;

pub struct Engine {
    pub config: Config,
    pub index: Arc<MemoryVectorIndex>,
    pub ingestion: Arc<IngestionPipeline>,
    pub queries: QueryPipeline,
    index_path: PathBuf,
    registry_path: PathBuf,
}

impl Engine {
    /// Wire everything up from configuration and on-disk state
    pub async fn open(config: Config) -> Result<Self> {
        let index_path = config.data_dir.join("index.json");
        let registry_path = config.data_dir.join("documents.json");

        let index = Arc::new(MemoryVectorIndex::load_snapshot(&index_path)?);
        let storage = Arc::new(LocalStorage::new(config.data_dir.join("documents"))?);
        let embedder = Arc::new(HttpEmbedder::new(config.embedding.clone())?);
        let reasoning = Arc::new(HttpReasoningClient::new(config.reasoning.clone())?);

        let ingestion = Arc::new(IngestionPipeline::new(
            storage,
            embedder.clone(),
            index.clone(),
            config.chunking.clone(),
            config.retry.clone(),
        ));
        ingestion.restore(load_registry(&registry_path)?).await;

        let retriever = Arc::new(Retriever::new(
            embedder,
            index.clone(),
            config.retrieval.clone(),
            config.retry.clone(),
        ));
        let synthesizer = Arc::new(DecisionSynthesizer::new(
            reasoning.clone(),
            config.retry.clone(),
        ));
        let queries = QueryPipeline::new(
            Arc::new(EntityExtractor::new(reasoning)),
            retriever,
            synthesizer,
        );

        Ok(Self {
            config,
            index,
            ingestion,
            queries,
            index_path,
            registry_path,
        })
    }

    /// Persist the index snapshot and document registry
    pub async fn persist(&self) -> Result<()> {
        self.index.save_snapshot(&self.index_path).await?;
        let records = self.ingestion.documents().await;
        let content = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.registry_path, content)?;
        Ok(())
    }
}

fn load_registry(path: &PathBuf) -> Result<Vec<DocumentRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
