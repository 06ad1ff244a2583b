//! Evidence-grounded decision synthesis
//!
//! Feeds retrieved chunks, extracted entities, and the original query to the
//! reasoning service under a schema-constrained output contract. A response
//! failing schema validation gets exactly one repair re-prompt before the
//! whole synthesis fails.

use crate::chunk::ChunkId;
use crate::config::RetryConfig;
use crate::error::{ClauseMindError, Result};
use crate::index::ScoredChunk;
use crate::llm::{ChatMessage, ExtractedEntities, ReasoningClient};
use crate::retry::with_retry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Decision outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    NeedsMoreInfo,
}

/// Structured, cited decision for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision: Decision,
    /// Free-text justification referencing the cited clauses
    pub justification: String,
    /// Identities of the chunks actually used as evidence, in citation order
    pub cited_chunks: Vec<ChunkId>,
    /// Bounded confidence score, when the model reports one
    pub confidence: Option<f32>,
}

const SYSTEM_PROMPT: &str = "You are an insurance claims adjudicator. Decide whether the \
described claim is approved or rejected based ONLY on the provided policy clauses. \
Output ONLY a JSON object with fields: decision (\"approved\", \"rejected\", or \
\"needs_more_info\"), justification (string citing clause tags like [C1]), \
citations (array of clause tags you relied on, e.g. [\"C1\", \"C3\"]), \
confidence (number between 0 and 1, optional). \
If the clauses do not answer the question, use \"needs_more_info\".";

/// Raw model output shape, validated before it becomes a `DecisionResult`
#[derive(Debug, Deserialize)]
struct RawDecision {
    decision: String,
    justification: String,
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Turns retrieved evidence into a structured, cited decision
pub struct DecisionSynthesizer {
    reasoning: Arc<dyn ReasoningClient>,
    retry: RetryConfig,
}

impl DecisionSynthesizer {
    pub fn new(reasoning: Arc<dyn ReasoningClient>, retry: RetryConfig) -> Self {
        Self { reasoning, retry }
    }

    /// Synthesize a decision from retrieved chunks.
    ///
    /// With no evidence the answer is `needs_more_info` and the reasoning
    /// service is not invoked at all.
    pub async fn synthesize(
        &self,
        query: &str,
        entities: &ExtractedEntities,
        chunks: &[ScoredChunk],
    ) -> Result<DecisionResult> {
        if chunks.is_empty() {
            return Ok(DecisionResult {
                decision: Decision::NeedsMoreInfo,
                justification: "No relevant policy clauses were found for this query."
                    .to_string(),
                cited_chunks: Vec::new(),
                confidence: None,
            });
        }

        let prompt = build_decision_prompt(query, entities, chunks);
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let response = with_retry(&self.retry, || {
            self.reasoning.complete(messages.clone())
        })
        .await?;

        match validate_decision(&response, chunks) {
            Ok(result) => Ok(result),
            Err(validation_error) => {
                tracing::warn!(
                    "decision output failed validation, repairing: {}",
                    validation_error
                );
                let repair = self.repair(&messages, &response, &validation_error).await?;
                validate_decision(&repair, chunks).map_err(|e| ClauseMindError::Synthesis {
                    message: format!("repair attempt still invalid: {}", e),
                    raw_output: repair,
                })
            }
        }
    }

    /// Re-prompt once with the validation error attached
    async fn repair(
        &self,
        original: &[ChatMessage],
        bad_output: &str,
        validation_error: &str,
    ) -> Result<String> {
        let mut messages = original.to_vec();
        messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: bad_output.to_string(),
        });
        messages.push(ChatMessage::user(format!(
            "Your previous output failed validation: {}. \
             Respond again with ONLY the corrected JSON object.",
            validation_error
        )));

        with_retry(&self.retry, || self.reasoning.complete(messages.clone())).await
    }
}

fn build_decision_prompt(
    query: &str,
    entities: &ExtractedEntities,
    chunks: &[ScoredChunk],
) -> String {
    let mut prompt = String::new();

    prompt.push_str("Query:\n");
    prompt.push_str(query);
    prompt.push_str("\n\n");

    if !entities.is_empty() {
        prompt.push_str("Extracted attributes:\n");
        prompt.push_str(&serde_json::to_string(&entities.0).unwrap_or_default());
        prompt.push_str("\n\n");
    }

    prompt.push_str("Policy clauses:\n");
    for (i, scored) in chunks.iter().enumerate() {
        prompt.push_str(&format!("[C{}] {}\n\n", i + 1, scored.chunk.text.trim()));
    }

    prompt.push_str("Decision JSON:");
    prompt
}

/// Validate raw model output against the decision schema and resolve
/// citation tags back to chunk identities. Citations to unknown tags are
/// dropped rather than failing the decision.
fn validate_decision(
    response: &str,
    chunks: &[ScoredChunk],
) -> std::result::Result<DecisionResult, String> {
    let json_str = crate::llm::extract_json_object(response)
        .ok_or_else(|| "no JSON object found in response".to_string())?;

    let raw: RawDecision =
        serde_json::from_str(json_str).map_err(|e| format!("schema violation: {}", e))?;

    let decision = match raw.decision.as_str() {
        "approved" => Decision::Approved,
        "rejected" => Decision::Rejected,
        "needs_more_info" => Decision::NeedsMoreInfo,
        other => return Err(format!("unknown decision value '{}'", other)),
    };

    if raw.justification.trim().is_empty() {
        return Err("justification must not be empty".to_string());
    }

    let mut cited_chunks = Vec::new();
    for tag in &raw.citations {
        let tag = tag.trim().trim_start_matches("[C").trim_start_matches('C');
        let tag = tag.trim_end_matches(']');
        if let Ok(n) = tag.parse::<usize>() {
            if n >= 1 && n <= chunks.len() {
                let id = chunks[n - 1].chunk.id();
                if !cited_chunks.contains(&id) {
                    cited_chunks.push(id);
                }
                continue;
            }
        }
        tracing::debug!("dropping citation to unknown clause tag '{}'", tag);
    }

    Ok(DecisionResult {
        decision,
        justification: raw.justification,
        cited_chunks,
        confidence: raw.confidence.map(|c| c.clamp(0.0, 1.0)),
    })
}
