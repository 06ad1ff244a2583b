//! Entity extraction from natural-language queries
//!
//! Best-effort structured enrichment. Extraction never blocks the query
//! pipeline: provider failures and unparseable output degrade to the
//! rule-based extractor, and in the worst case to an empty mapping.

use super::client::{extract_json_object, ChatMessage, ReasoningClient};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Controlled vocabulary of attribute names; keys outside this list are
/// dropped, never fabricated
pub const ENTITY_VOCABULARY: &[&str] = &[
    "age",
    "gender",
    "procedure",
    "location",
    "policy_duration_months",
    "amount",
];

/// Attributes inferred from a query, keyed by the controlled vocabulary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities(pub BTreeMap<String, Value>);

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a value, ignoring keys outside the controlled vocabulary
    pub fn insert(&mut self, key: &str, value: Value) {
        if ENTITY_VOCABULARY.contains(&key) && !value.is_null() {
            self.0.insert(key.to_string(), value);
        }
    }

    /// Textual forms of each entity value, for re-ranking against chunk text
    pub fn values_as_text(&self) -> Vec<String> {
        self.0
            .values()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }
}

lazy_static! {
    static ref AGE_RE: Regex =
        Regex::new(r"(?i)\b(\d{1,3})\s*(?:-?\s*year[\s-]*old|yo\b|y/o|years?\s+old)").unwrap();
    static ref AGE_PREFIX_RE: Regex = Regex::new(r"(?i)\bage[d:\s]+(\d{1,3})\b").unwrap();
    static ref AGE_GENDER_RE: Regex = Regex::new(r"\b(\d{1,3})\s*([MF])\b").unwrap();
    static ref GENDER_RE: Regex = Regex::new(r"(?i)\b(male|female|man|woman)\b").unwrap();
    static ref DURATION_RE: Regex =
        Regex::new(r"(?i)\b(\d{1,3})\s*-?\s*month(?:s)?(?:\s*-?\s*old)?\s+(?:insurance\s+)?policy")
            .unwrap();
    static ref AMOUNT_RE: Regex =
        Regex::new(r"(?i)(?:rs\.?|inr|₹|\$)\s*([\d,]+(?:\.\d+)?)").unwrap();
}

/// Procedure keywords common in health-insurance queries
const PROCEDURES: &[&str] = &[
    "dental",
    "knee surgery",
    "knee replacement",
    "cataract",
    "maternity",
    "bypass",
    "angioplasty",
    "chemotherapy",
    "dialysis",
    "hernia",
    "appendectomy",
    "physiotherapy",
    "surgery",
];

const LOCATIONS: &[&str] = &[
    "pune", "mumbai", "delhi", "bangalore", "chennai", "hyderabad", "kolkata", "ahmedabad",
    "jaipur", "lucknow",
];

/// Rule-based extraction used as the fallback path
pub fn extract_with_rules(query: &str) -> ExtractedEntities {
    let mut entities = ExtractedEntities::default();

    if let Some(caps) = AGE_RE.captures(query).or_else(|| AGE_PREFIX_RE.captures(query)) {
        if let Ok(age) = caps[1].parse::<u64>() {
            entities.insert("age", Value::from(age));
        }
    } else if let Some(caps) = AGE_GENDER_RE.captures(query) {
        if let Ok(age) = caps[1].parse::<u64>() {
            entities.insert("age", Value::from(age));
            let gender = if &caps[2] == "M" { "male" } else { "female" };
            entities.insert("gender", Value::from(gender));
        }
    }

    if entities.get("gender").is_none() {
        if let Some(caps) = GENDER_RE.captures(query) {
            let gender = match caps[1].to_lowercase().as_str() {
                "male" | "man" => "male",
                _ => "female",
            };
            entities.insert("gender", Value::from(gender));
        }
    }

    let lower = query.to_lowercase();
    // Multiword phrases are listed before their general forms so
    // "knee surgery" wins over "surgery"
    if let Some(procedure) = PROCEDURES.iter().find(|p| lower.contains(*p)) {
        entities.insert("procedure", Value::from(*procedure));
    }

    if let Some(location) = LOCATIONS.iter().find(|l| lower.contains(*l)) {
        entities.insert("location", Value::from(*location));
    }

    if let Some(caps) = DURATION_RE.captures(query) {
        if let Ok(months) = caps[1].parse::<u64>() {
            entities.insert("policy_duration_months", Value::from(months));
        }
    }

    if let Some(caps) = AMOUNT_RE.captures(query) {
        let cleaned = caps[1].replace(',', "");
        if let Ok(amount) = cleaned.parse::<f64>() {
            entities.insert("amount", Value::from(amount));
        }
    }

    entities
}

/// Parses free-text queries into structured attributes.
///
/// With a reasoning client configured, extraction goes through the LLM and
/// falls back to rules on any failure; without one, rules run directly.
pub struct EntityExtractor {
    reasoning: Option<Arc<dyn ReasoningClient>>,
}

impl EntityExtractor {
    pub fn new(reasoning: Arc<dyn ReasoningClient>) -> Self {
        Self {
            reasoning: Some(reasoning),
        }
    }

    /// Rule-based extraction only, no provider calls
    pub fn rule_based() -> Self {
        Self { reasoning: None }
    }

    /// Extract entities from a query. Never errors.
    pub async fn extract(&self, query: &str) -> ExtractedEntities {
        if let Some(ref client) = self.reasoning {
            match self.extract_with_llm(client.as_ref(), query).await {
                Ok(entities) => return entities,
                Err(e) => {
                    tracing::warn!("entity extraction via LLM failed, using rules: {}", e);
                }
            }
        }
        extract_with_rules(query)
    }

    async fn extract_with_llm(
        &self,
        client: &dyn ReasoningClient,
        query: &str,
    ) -> crate::error::Result<ExtractedEntities> {
        let messages = vec![
            ChatMessage::system(
                "You extract structured attributes from insurance queries. \
                 Output ONLY a JSON object. Allowed keys: age (number), gender (string), \
                 procedure (string), location (string), policy_duration_months (number), \
                 amount (number). Omit any attribute not present in the query. \
                 Never invent values.",
            ),
            ChatMessage::user(build_extraction_prompt(query)),
        ];

        let response = client.complete(messages).await?;
        parse_entity_response(&response)
    }
}

fn build_extraction_prompt(query: &str) -> String {
    format!(
        r#"Extract attributes from this query:

Query: "{}"

Examples:
Input: "46M, knee surgery in Pune, 3-month policy"
Output: {{"age": 46, "gender": "male", "procedure": "knee surgery", "location": "pune", "policy_duration_months": 3}}

Input: "Is a 16-year-old eligible for a dental claim?"
Output: {{"age": 16, "procedure": "dental"}}

Input: "What is the waiting period for claims?"
Output: {{}}

Now extract from the query above. Output only JSON:"#,
        query
    )
}

fn parse_entity_response(response: &str) -> crate::error::Result<ExtractedEntities> {
    let json_str = extract_json_object(response).ok_or_else(|| {
        crate::error::ClauseMindError::ReasoningService {
            message: "no JSON object in entity extraction response".to_string(),
            transient: false,
        }
    })?;

    let parsed: BTreeMap<String, Value> = serde_json::from_str(json_str)?;

    let mut entities = ExtractedEntities::default();
    for (key, value) in parsed {
        // insert drops keys outside the vocabulary
        entities.insert(&key, value);
    }
    Ok(entities)
}
