use thiserror::Error;

/// Errors raised for genuinely invalid input.
///
/// Expected conditions (ambiguous query, missing period, missing embedding
/// model) are never errors; they come back as structured results.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("invalid test case '{id}': {reason}")]
    InvalidTestCase { id: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl QaError {
    pub(crate) fn invalid_case(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTestCase {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
