use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
    Extension,
};
use uuid::Uuid;

use super::error::unauthorized;
use super::problem::ProblemResponse;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Caller identity, established upstream and forwarded in `x-user-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_string();
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("missing x-user-id header", &instance))?;
        Uuid::parse_str(raw.trim())
            .map(CurrentUser)
            .map_err(|_| unauthorized("x-user-id is not a valid UUID", &instance))
    }
}

/// Anonymous callers are allowed; a malformed header is still rejected.
impl<S: Send + Sync> OptionalFromRequestParts<S> for CurrentUser {
    type Rejection = ProblemResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(USER_ID_HEADER) {
            return Ok(None);
        }
        <CurrentUser as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

/// Configured admin secret; `None` disables every admin endpoint.
#[derive(Clone, Default)]
pub struct AdminToken(pub Option<String>);

/// Proof that the request carried the admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl<S: Send + Sync> FromRequestParts<S> for AdminAccess {
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_string();
        let Extension(AdminToken(expected)) =
            <Extension<AdminToken> as FromRequestParts<S>>::from_request_parts(parts, state)
                .await
                .map_err(|_| unauthorized("admin access is not configured", &instance))?;
        let Some(expected) = expected.filter(|t| !t.is_empty()) else {
            return Err(unauthorized("admin access is not configured", &instance));
        };
        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        match presented {
            Some(token) if token == expected => Ok(AdminAccess),
            _ => Err(unauthorized("invalid admin token", &instance)),
        }
    }
}
