//! `clausemind stats` - vector index statistics

use crate::app::OutputFormat;
use crate::engine::Engine;
use clausemind_core::{Result, VectorIndex};

pub async fn run(engine: &Engine, format: OutputFormat) -> Result<()> {
    let stats = engine.index.stats().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Cli => {
            println!("documents:  {}", stats.document_count);
            println!("entries:    {}", stats.entry_count);
            println!(
                "model:      {}",
                stats.model.as_deref().unwrap_or("(empty index)")
            );
            if let Some(dims) = stats.dimensions {
                println!("dimensions: {}", dims);
            }
        }
    }
    Ok(())
}
