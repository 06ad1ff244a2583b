//! `clausemind documents` - list ingested documents

use crate::app::OutputFormat;
use crate::engine::Engine;
use clausemind_core::Result;

pub async fn run(engine: &Engine, format: OutputFormat) -> Result<()> {
    let records = engine.ingestion.documents().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Cli => {
            if records.is_empty() {
                println!("no documents ingested");
                return Ok(());
            }
            for record in records {
                println!(
                    "{}  {:?}  {} chunks  {}  {}",
                    record.document_id,
                    record.status,
                    record.chunk_count,
                    record.uploaded_at.format("%Y-%m-%d %H:%M"),
                    record.filename,
                );
                if let Some(ref error) = record.error {
                    println!("    reason: {}", error);
                }
            }
        }
    }
    Ok(())
}
