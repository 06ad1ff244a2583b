//! `clausemind delete` - remove a document and its index entries

use crate::app::{DeleteArgs, OutputFormat};
use crate::engine::Engine;
use clausemind_core::Result;

pub async fn run(args: DeleteArgs, engine: &Engine, format: OutputFormat) -> Result<()> {
    engine.ingestion.delete_document(&args.document_id).await?;
    engine.persist().await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "deleted": args.document_id })
        ),
        OutputFormat::Cli => println!("deleted {}", args.document_id),
    }
    Ok(())
}
