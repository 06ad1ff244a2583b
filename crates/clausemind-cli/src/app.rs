//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clausemind")]
#[command(
    author,
    version,
    about = "Clause retrieval and evidence-grounded decisions over insurance documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a document (PDF or plain text) into the index
    Ingest(IngestArgs),

    /// Ask a question and get a cited decision
    Query(QueryArgs),

    /// List ingested documents and their statuses
    Documents,

    /// Show vector index statistics
    Stats,

    /// Delete a document and all its index entries
    Delete(DeleteArgs),

    /// Show effective configuration
    Health,
}

#[derive(Args)]
pub struct IngestArgs {
    /// Path to the document file
    pub path: PathBuf,

    /// Return immediately and index in the background
    #[arg(long)]
    pub detach: bool,
}

#[derive(Args)]
pub struct QueryArgs {
    /// The natural-language question
    pub question: String,

    /// Restrict retrieval to these document ids (repeatable)
    #[arg(long = "doc")]
    pub document_ids: Vec<String>,

    /// Number of clauses to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Document id to delete
    pub document_id: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
