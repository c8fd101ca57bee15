//! Error taxonomy for the answer router.
//!
//! Only [`DataError`] is fatal (at startup). Generation and search failures are
//! recovered inside [`crate::RoutingPolicy`] and never reach the end user.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Knowledge base could not be loaded.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("knowledge data not found at {0}")]
    Missing(PathBuf),

    #[error("failed to read knowledge data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed knowledge data: {0}")]
    Malformed(String),

    #[error("knowledge store error: {0}")]
    Store(#[from] sled::Error),
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Malformed(e.to_string())
    }
}

/// Generative backend failed or timed out.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generative backend unavailable: {0}")]
    Unavailable(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse generation response: {0}")]
    Parse(String),

    #[error("generative backend returned an empty response")]
    EmptyResponse,
}

/// Web search failed. Always recovered by proceeding with no snippets.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search network error: {0}")]
    Network(String),

    #[error("search API error (status {status})")]
    Api { status: u16 },

    #[error("failed to parse search response: {0}")]
    Parse(String),

    #[error("search timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GenerationError::Api {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "generation API error (status 503): overloaded"
        );
        let err = DataError::Missing(PathBuf::from("data/knowledge.json"));
        assert_eq!(err.to_string(), "knowledge data not found at data/knowledge.json");
    }

    #[test]
    fn test_json_error_becomes_malformed() {
        let json_err = serde_json::from_str::<serde_json::Value>("[{").unwrap_err();
        let err: DataError = json_err.into();
        assert!(matches!(err, DataError::Malformed(_)));
    }
}
