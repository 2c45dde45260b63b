//! Error types for the RAG core

use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG core errors
///
/// `Validation` is never retried, `Upstream`/`Timeout` are retried only by
/// the ingestion queue, and `Rerank` is always swallowed by the reranker's
/// fallback path.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad caller input, surfaced immediately
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Embedding/index/model provider failure
    #[error("Upstream service failure: {0}")]
    Upstream(String),

    /// Provider exceeded the configured deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Second-pass ranking failure (non-fatal)
    #[error("Reranking failed: {0}")]
    Rerank(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an upstream error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the ingestion queue may retry a job that failed with this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Upstream(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(Error::upstream("503").is_retryable());
        assert!(Error::Timeout("deadline".into()).is_retryable());
        assert!(!Error::validation("empty message").is_retryable());
        assert!(!Error::Rerank("scores unavailable".into()).is_retryable());
        assert!(!Error::UnsupportedFileType("exe".into()).is_retryable());
    }
}
