//! Command implementations

pub mod delete;
pub mod documents;
pub mod health;
pub mod ingest;
pub mod query;
pub mod stats;
