//! Error types for clausemind

use thiserror::Error;

/// Result type alias using ClauseMindError
pub type Result<T> = std::result::Result<T, ClauseMindError>;

/// Error type alias for convenience
pub type Error = ClauseMindError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UPSTREAM_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const VALIDATION_ERROR: i32 = 3;
}

/// Main error type for clausemind
#[derive(Debug, Error)]
pub enum ClauseMindError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding service error: {message}")]
    EmbeddingService { message: String, transient: bool },

    #[error("Reasoning service error: {message}")]
    ReasoningService { message: String, transient: bool },

    #[error("Index service error: {0}")]
    IndexService(String),

    #[error("Embedding model mismatch: index holds '{expected}', got '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("Decision synthesis failed: {message}")]
    Synthesis { message: String, raw_output: String },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Text extraction error: {0}")]
    Extraction(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ClauseMindError {
    /// Whether a retry with backoff may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::EmbeddingService { transient, .. } => *transient,
            Self::ReasoningService { transient, .. } => *transient,
            Self::IndexService(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DocumentNotFound(_) => exit_codes::NOT_FOUND,
            Self::Configuration(_) | Self::InvalidInput(_) => exit_codes::VALIDATION_ERROR,
            _ => exit_codes::UPSTREAM_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let e = ClauseMindError::EmbeddingService {
            message: "rate limited".into(),
            transient: true,
        };
        assert!(e.is_transient());

        let e = ClauseMindError::EmbeddingService {
            message: "bad api key".into(),
            transient: false,
        };
        assert!(!e.is_transient());

        assert!(!ClauseMindError::Configuration("overlap >= size".into()).is_transient());
        assert!(!ClauseMindError::ModelMismatch {
            expected: "a".into(),
            actual: "b".into(),
        }
        .is_transient());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            ClauseMindError::DocumentNotFound("abc".into()).exit_code(),
            exit_codes::NOT_FOUND
        );
        assert_eq!(
            ClauseMindError::InvalidInput("empty query".into()).exit_code(),
            exit_codes::VALIDATION_ERROR
        );
        assert_eq!(
            ClauseMindError::IndexService("unreachable".into()).exit_code(),
            exit_codes::UPSTREAM_ERROR
        );
    }
}
