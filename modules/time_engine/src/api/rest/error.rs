use axum::http::StatusCode;

use super::problem::{Problem, ProblemResponse};
use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.playops.dev/{}", code))
        .with_code(code)
        .with_instance(instance);

    let problem = if let Some(id) = tracing::Span::current().id() {
        problem.with_trace_id(id.into_u64().to_string())
    } else {
        problem
    };

    ProblemResponse(problem)
}

pub fn unauthorized(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::UNAUTHORIZED,
        "TIME_UNAUTHORIZED",
        "Unauthorized",
        detail,
        instance,
    )
}

pub fn bad_request(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "TIME_VALIDATION",
        "Validation error",
        detail,
        instance,
    )
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::ProfileNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "TIME_PROFILE_NOT_FOUND",
            "Profile not found",
            format!("Profile {} was not found", id),
            instance,
        ),
        DomainError::MissionNotFound { id } | DomainError::MissionInactive { id } => from_parts(
            StatusCode::NOT_FOUND,
            "TIME_MISSION_NOT_FOUND",
            "Mission not found",
            format!("Mission {} was not found or is not active", id),
            instance,
        ),
        DomainError::QuestionNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "TIME_QUESTION_NOT_FOUND",
            "Question not found",
            format!("Question {} was not found", id),
            instance,
        ),
        DomainError::AlreadyCompleted { mission_id, .. } => from_parts(
            StatusCode::CONFLICT,
            "TIME_MISSION_ALREADY_COMPLETED",
            "Mission already completed",
            format!("Mission {} was already completed", mission_id),
            instance,
        ),
        DomainError::Validation { .. } => bad_request(e.to_string(), instance),
        DomainError::Unauthorized => unauthorized("Missing or invalid credentials", instance),
        DomainError::Timeout { .. } => {
            tracing::warn!(error = ?e, "Store call timed out");
            from_parts(
                StatusCode::SERVICE_UNAVAILABLE,
                "TIME_STORAGE_UNAVAILABLE",
                "Storage unavailable",
                "The store did not answer in time; retry later",
                instance,
            )
        }
        DomainError::Storage { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
        DomainError::StreakUpdateFailed { .. } => {
            tracing::error!(error = ?e, "Reconcile run failed");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TIME_RECONCILE_FAILED",
                "Reconcile failed",
                e.to_string(),
                instance,
            )
        }
    }
}
