use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Extension, Router,
};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use super::dto::TimeEvent;
use super::extract::AdminToken;
use super::request_id::{self, MakeReqId};
use super::{handlers, sse::SseBroadcaster};
use crate::domain::service::Service;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// HTTP-level knobs taken from the server section.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    pub cors_enabled: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_enabled: false,
        }
    }
}

/// Build the full REST surface with its middleware stack.
pub fn router(
    service: Arc<Service>,
    events: SseBroadcaster<TimeEvent>,
    admin_token: Option<String>,
    options: &HttpOptions,
) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(handlers::openapi_json))
        .route("/profiles", post(handlers::create_profile))
        .route("/profiles/{id}", get(handlers::get_profile))
        .route("/profiles/{id}/rank", get(handlers::get_rank))
        .route(
            "/profiles/{id}/missions",
            get(handlers::list_completed_missions),
        )
        .route("/missions", get(handlers::list_missions))
        .route("/missions/{id}/complete", post(handlers::complete_mission))
        .route("/questions/today", get(handlers::question_today))
        .route(
            "/questions/{id}/responses",
            post(handlers::submit_response),
        )
        .route("/leaderboard", get(handlers::leaderboard))
        .route("/events", get(handlers::events))
        .route("/admin/reconcile", post(handlers::reconcile))
        .route("/admin/profiles/{id}/time", post(handlers::adjust_time))
        .route("/admin/profiles/{id}/xp", post(handlers::adjust_xp))
        .route("/admin/missions", post(handlers::create_mission))
        .route("/admin/questions", post(handlers::create_question))
        .layer(Extension(service))
        .layer(Extension(events))
        .layer(Extension(AdminToken(admin_token)));

    // Layers wrap outward, so the last one added runs first:
    // SetRequestId -> PropagateRequestId -> push_req_id -> Trace -> Timeout -> CORS -> BodyLimit
    router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
    if options.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    router = router.layer(TimeoutLayer::new(options.request_timeout));
    router = router.layer(request_id::create_trace_layer());
    router = router.layer(from_fn(request_id::push_req_id_to_extensions));
    router = router.layer(PropagateRequestIdLayer::new(request_id::header()));
    router.layer(SetRequestIdLayer::new(request_id::header(), MakeReqId))
}
