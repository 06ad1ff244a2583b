//! Embedding generation via external services
//!
//! Vectors are tagged with the model that produced them so the index can
//! refuse cross-model similarity comparison instead of silently returning
//! meaningless scores.

use crate::config::EmbeddingServiceConfig;
use crate::error::{ClauseMindError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A fixed-length vector representation of text, tagged with its model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
}

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for batch of texts (order-preserving, equivalent
    /// to repeated single calls)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Embedder that uses an external OpenAI-compatible HTTP service
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    config: EmbeddingServiceConfig,
}

impl HttpEmbedder {
    /// Create new embedder from configuration
    pub fn new(config: EmbeddingServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClauseMindError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

/// 408/429/5xx are worth retrying; everything else is a caller problem
fn transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results.into_iter().next().ok_or_else(|| {
            ClauseMindError::EmbeddingService {
                message: "no embedding returned".to_string(),
                transient: false,
            }
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };

        let url = format!("{}/v1/embeddings", self.config.url.trim_end_matches('/'));

        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(ClauseMindError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClauseMindError::EmbeddingService {
                message: format!("HTTP {}: {}", status, body),
                transient: transient_status(status),
            });
        }

        let mut embed_response: EmbedResponse =
            response.json().await.map_err(ClauseMindError::Http)?;

        if embed_response.data.len() != texts.len() {
            return Err(ClauseMindError::EmbeddingService {
                message: format!(
                    "service returned {} embeddings for {} inputs",
                    embed_response.data.len(),
                    texts.len()
                ),
                transient: false,
            });
        }

        // Providers may reorder entries; the index field is authoritative
        embed_response.data.sort_by_key(|entry| entry.index);

        Ok(embed_response
            .data
            .into_iter()
            .map(|entry| Embedding {
                vector: entry.embedding,
                model: self.config.model.clone(),
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
