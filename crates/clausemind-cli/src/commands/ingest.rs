//! `clausemind ingest` - chunk, embed, and index a document

use crate::app::{IngestArgs, OutputFormat};
use crate::engine::Engine;
use clausemind_core::{ClauseMindError, DocumentStatus, Result};
use std::time::Duration;

pub async fn run(args: IngestArgs, engine: &Engine, format: OutputFormat) -> Result<()> {
    let filename = args
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ClauseMindError::InvalidInput(format!("not a file path: {}", args.path.display()))
        })?
        .to_string();

    let bytes = tokio::fs::read(&args.path).await?;

    let record = if args.detach {
        let pending = engine
            .ingestion
            .ingest_bytes_detached(&filename, &bytes)
            .await?;
        println!("accepted {} for background indexing", pending.document_id);

        // The CLI process still has to outlive the background task; wait for
        // a terminal status before persisting.
        loop {
            match engine.ingestion.document(&pending.document_id).await {
                Some(r) if matches!(r.status, DocumentStatus::Indexed | DocumentStatus::Failed) => {
                    break r
                }
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    } else {
        engine.ingestion.ingest_bytes(&filename, &bytes).await?
    };

    engine.persist().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Cli => {
            println!("document:  {}", record.document_id);
            println!("status:    {:?}", record.status);
            println!("chunks:    {}", record.chunk_count);
            if let Some(ref error) = record.error {
                println!("error:     {}", error);
            }
        }
    }

    if record.status == DocumentStatus::Failed {
        return Err(ClauseMindError::IndexService(
            record
                .error
                .unwrap_or_else(|| "ingestion failed".to_string()),
        ));
    }
    Ok(())
}
