use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::contract::TimeEngineError;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Profile not found: {id}")]
    ProfileNotFound { id: Uuid },

    #[error("Mission not found: {id}")]
    MissionNotFound { id: Uuid },

    #[error("Mission {id} is not active")]
    MissionInactive { id: Uuid },

    #[error("Question not found: {id}")]
    QuestionNotFound { id: Uuid },

    #[error("Mission {mission_id} already completed by {user_id}")]
    AlreadyCompleted { user_id: Uuid, mission_id: Uuid },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Storage error: {message}")]
    Storage { message: String, retryable: bool },

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Streak update failed after {attempts} attempts: {message}")]
    StreakUpdateFailed { attempts: u32, message: String },

    #[error("Unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn profile_not_found(id: Uuid) -> Self {
        Self::ProfileNotFound { id }
    }

    pub fn mission_not_found(id: Uuid) -> Self {
        Self::MissionNotFound { id }
    }

    pub fn mission_inactive(id: Uuid) -> Self {
        Self::MissionInactive { id }
    }

    pub fn question_not_found(id: Uuid) -> Self {
        Self::QuestionNotFound { id }
    }

    pub fn already_completed(user_id: Uuid, mission_id: Uuid) -> Self {
        Self::AlreadyCompleted {
            user_id,
            mission_id,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage {
                retryable: true,
                ..
            } | Self::Timeout { .. }
                | Self::StreakUpdateFailed { .. }
        )
    }
}

impl From<DomainError> for TimeEngineError {
    fn from(e: DomainError) -> Self {
        let retryable = e.is_retryable();
        match e {
            DomainError::ProfileNotFound { id } => Self::not_found("profile", id),
            DomainError::MissionNotFound { id } | DomainError::MissionInactive { id } => {
                Self::not_found("mission", id)
            }
            DomainError::QuestionNotFound { id } => Self::not_found("question", id),
            DomainError::AlreadyCompleted { mission_id, .. } => {
                Self::AlreadyCompleted { mission_id }
            }
            DomainError::Validation { field, message } => {
                Self::validation(format!("{field}: {message}"))
            }
            DomainError::Storage { message, .. } => Self::storage(message, retryable),
            DomainError::Timeout {
                operation,
                after_ms,
            } => Self::storage(format!("{operation} timed out after {after_ms}ms"), retryable),
            DomainError::StreakUpdateFailed { .. } => Self::internal(),
            DomainError::Unauthorized => Self::Unauthorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_mission_is_reported_as_missing() {
        let id = Uuid::new_v4();
        assert_eq!(
            TimeEngineError::from(DomainError::mission_inactive(id)),
            TimeEngineError::not_found("mission", id)
        );
    }

    #[test]
    fn timeouts_stay_retryable_across_the_boundary() {
        let e = DomainError::timeout("profiles.find", Duration::from_millis(250));
        assert!(e.is_retryable());
        let public = TimeEngineError::from(e);
        assert!(public.is_retryable());
        assert!(public.to_string().contains("250ms"));
    }

    #[test]
    fn validation_keeps_field_name() {
        let public = TimeEngineError::from(DomainError::validation("response", "empty"));
        assert_eq!(public, TimeEngineError::validation("response: empty"));
        assert!(!DomainError::Unauthorized.is_retryable());
    }
}
