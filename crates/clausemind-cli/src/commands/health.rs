//! `clausemind health` - show effective configuration

use crate::app::OutputFormat;
use crate::engine::Engine;
use clausemind_core::Result;

pub fn run(engine: &Engine, format: OutputFormat) -> Result<()> {
    let config = &engine.config;

    match format {
        OutputFormat::Json => {
            // API keys stay out of the output
            let summary = serde_json::json!({
                "embedding": { "url": config.embedding.url, "model": config.embedding.model },
                "reasoning": { "url": config.reasoning.url, "model": config.reasoning.model },
                "chunking": { "size": config.chunking.chunk_size, "overlap": config.chunking.chunk_overlap },
                "retrieval": { "top_k": config.retrieval.top_k, "max_top_k": config.retrieval.max_top_k },
                "data_dir": config.data_dir,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Cli => {
            println!("embedding service: {} ({})", config.embedding.url, config.embedding.model);
            println!("reasoning service: {} ({})", config.reasoning.url, config.reasoning.model);
            println!(
                "chunking:          size {} / overlap {}",
                config.chunking.chunk_size, config.chunking.chunk_overlap
            );
            println!(
                "retrieval:         top_k {} (max {})",
                config.retrieval.top_k, config.retrieval.max_top_k
            );
            println!("data dir:          {}", config.data_dir.display());
        }
    }
    Ok(())
}
