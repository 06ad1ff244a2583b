//! Reasoning (LLM) integration
//!
//! Provides the chat-completion client used by entity extraction and
//! decision synthesis.

mod client;
mod entities;

pub use client::{ChatMessage, HttpReasoningClient, ReasoningClient};
pub(crate) use client::extract_json_object;
pub use entities::{extract_with_rules, EntityExtractor, ExtractedEntities, ENTITY_VOCABULARY};
