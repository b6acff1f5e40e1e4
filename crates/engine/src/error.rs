use thiserror::Error;

use vetta_store::StoreError;

/// Canonical caller-facing error codes. Internal retries, model switches,
/// and evaluation fallbacks never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("SESSION_NOT_FOUND")]
    SessionNotFound,
    #[error("NOT_IN_PROGRESS")]
    NotInProgress,
    #[error("ALREADY_COMPLETED")]
    AlreadyCompleted,
    #[error("QUESTION_NOT_FOUND")]
    QuestionNotFound,
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound => EngineError::SessionNotFound,
            other => EngineError::Store(other),
        }
    }
}
