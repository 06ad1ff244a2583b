//! Orchestration pipelines
//!
//! Ingestion writes into the vector index; querying reads from it. The two
//! share no mutable state beyond the index itself.

mod ingest;
mod query;

pub use ingest::{DocumentRecord, DocumentStatus, IngestionPipeline};
pub use query::{QueryPipeline, QueryResponse};
