use thiserror::Error;
use uuid::Uuid;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeEngineError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: Uuid },

    #[error("Mission {mission_id} already completed")]
    AlreadyCompleted { mission_id: Uuid },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage unavailable: {message}")]
    Storage { message: String, retryable: bool },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error")]
    Internal,
}

impl TimeEngineError {
    pub fn not_found(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>, retryable: bool) -> Self {
        Self::Storage {
            message: message.into(),
            retryable,
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { retryable: true, .. })
    }
}
