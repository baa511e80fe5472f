use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriageError {
    #[error("Invalid symptom input: {0}")]
    InvalidInput(String),

    #[error("Classification unavailable: {0}")]
    ClassificationUnavailable(String),
}

impl TriageError {
    /// Only backend failures are worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TriageError::ClassificationUnavailable(_))
    }
}

impl From<TriageError> for AppError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::InvalidInput(msg) => AppError::ValidationError(msg),
            TriageError::ClassificationUnavailable(msg) => AppError::Unavailable(msg),
        }
    }
}
