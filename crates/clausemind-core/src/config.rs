//! Configuration management
//!
//! A single `Config` is constructed at process start and passed by reference
//! into every component; nothing below this module reads the environment.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingServiceConfig,

    /// Reasoning (LLM) service configuration
    #[serde(default)]
    pub reasoning: ReasoningServiceConfig,

    /// Document chunking parameters
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Retry policy for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Directory for locally stored documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingServiceConfig::default(),
            reasoning: ReasoningServiceConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            retry: RetryConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

/// Embedding service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    /// Base URL of the embeddings service
    pub url: String,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimensions
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("CLAUSEMIND_EMBEDDING_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            model: default_embedding_model(),
            dimensions: std::env::var("CLAUSEMIND_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_embedding_dimensions),
            api_key: std::env::var("CLAUSEMIND_EMBEDDING_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Reasoning service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningServiceConfig {
    /// Base URL of the LLM service for chat/completions
    pub url: String,

    /// Model name for decision synthesis and entity extraction
    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReasoningServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("CLAUSEMIND_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_reasoning_model(),
            api_key: std::env::var("CLAUSEMIND_LLM_API_KEY").ok(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Document chunking parameters (characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: env_usize("CLAUSEMIND_CHUNK_SIZE", default_chunk_size()),
            chunk_overlap: env_usize("CLAUSEMIND_CHUNK_OVERLAP", default_chunk_overlap()),
        }
    }
}

/// Retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of chunks returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Ceiling for caller-supplied top_k values (clamped, not rejected)
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Additive score boost per entity value found in a chunk
    #[serde(default = "default_entity_boost")]
    pub entity_boost: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: env_usize("CLAUSEMIND_TOP_K_RETRIEVAL", default_top_k()),
            max_top_k: default_max_top_k(),
            entity_boost: default_entity_boost(),
        }
    }
}

/// Retry policy for transient provider failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

fn env_usize(key: &str, fallback: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}

fn default_embedding_model() -> String {
    std::env::var("CLAUSEMIND_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_reasoning_model() -> String {
    std::env::var("CLAUSEMIND_LLM_MODEL").unwrap_or_else(|_| "gemini-pro".to_string())
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    30
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

fn default_max_top_k() -> usize {
    20
}

fn default_entity_boost() -> f32 {
    0.1
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::DATA_DIR_NAME)
}

impl Config {
    /// Load config from default path, falling back to env-backed defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}
