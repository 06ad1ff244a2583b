//! `clausemind query` - ask a question, get a cited decision

use crate::app::{OutputFormat, QueryArgs};
use crate::engine::Engine;
use clausemind_core::Result;

pub async fn run(args: QueryArgs, engine: &Engine, format: OutputFormat) -> Result<()> {
    let document_ids = if args.document_ids.is_empty() {
        None
    } else {
        Some(args.document_ids)
    };

    let response = engine
        .queries
        .answer(&args.question, document_ids, args.top_k)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Cli => {
            println!("decision:      {:?}", response.decision.decision);
            if let Some(confidence) = response.decision.confidence {
                println!("confidence:    {:.2}", confidence);
            }
            println!("justification: {}", response.decision.justification);

            if !response.entities.is_empty() {
                println!("\nextracted entities:");
                for (key, value) in &response.entities.0 {
                    println!("  {}: {}", key, value);
                }
            }

            if !response.decision.cited_chunks.is_empty() {
                println!("\ncited clauses:");
                for id in &response.decision.cited_chunks {
                    if let Some(scored) = response
                        .retrieved
                        .iter()
                        .find(|s| s.chunk.id() == *id)
                    {
                        println!(
                            "  [{}#{}] {}",
                            id.document_id,
                            id.seq,
                            scored.chunk.text.trim()
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
