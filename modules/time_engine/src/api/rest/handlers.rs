use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::dto::{
    AdjustReq, BalanceDto, CompletedMissionDto, CreateMissionReq, CreateProfileReq,
    CreateQuestionReq, LeaderboardParams, MissionDto, MissionRewardDto, ProfileDto, QuestionDto,
    RankDto, RankedProfileDto, ReconcileSummaryDto, ResponseOutcomeDto, SubmitResponseReq,
    TimeEvent,
};
use super::error::{from_parts, map_domain_error};
use super::extract::{AdminAccess, CurrentUser};
use super::openapi;
use super::problem::ProblemResponse;
use super::sse::SseBroadcaster;
use crate::contract::model::{LeaderboardQuery, NewProfile};
use crate::domain::service::Service;

type ApiResult<T> = Result<Json<T>, ProblemResponse>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn openapi_json() -> Json<Value> {
    Json(openapi::document())
}

/// Decayed balance; unknown users get the seeded default view.
pub async fn get_profile(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> ApiResult<BalanceDto> {
    let snapshot = svc
        .get_balance(id)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(snapshot.into()))
}

pub async fn create_profile(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
    Json(req): Json<CreateProfileReq>,
) -> Result<(StatusCode, Json<ProfileDto>), ProblemResponse> {
    let profile = svc
        .create_profile(NewProfile {
            id: user_id,
            username: req.username,
            avatar_url: req.avatar_url,
        })
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

pub async fn get_rank(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> ApiResult<RankDto> {
    let rank = svc
        .current_rank(id)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(RankDto { user_id: id, rank }))
}

pub async fn list_completed_missions(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> ApiResult<Vec<CompletedMissionDto>> {
    let done = svc
        .list_completed_missions(id)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(done.into_iter().map(Into::into).collect()))
}

pub async fn list_missions(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> ApiResult<Vec<MissionDto>> {
    let missions = svc
        .list_active_missions()
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(missions.into_iter().map(Into::into).collect()))
}

pub async fn complete_mission(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    Path(mission_id): Path<Uuid>,
    uri: Uri,
) -> ApiResult<MissionRewardDto> {
    info!(%user_id, %mission_id, "completing mission");
    let reward = svc
        .complete_mission(user_id, mission_id)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(reward.into()))
}

pub async fn question_today(
    Extension(svc): Extension<Arc<Service>>,
    user: Option<CurrentUser>,
    uri: Uri,
) -> ApiResult<QuestionDto> {
    let question = svc
        .question_for_today()
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?
        .ok_or_else(|| {
            from_parts(
                StatusCode::NOT_FOUND,
                "TIME_QUESTION_NOT_FOUND",
                "Question not found",
                "No question is scheduled for today",
                uri.path(),
            )
        })?;

    let has_responded = match user {
        Some(CurrentUser(user_id)) => Some(
            svc.has_responded(user_id, question.id)
                .await
                .map_err(|e| map_domain_error(&e, uri.path()))?,
        ),
        None => None,
    };
    let mut dto = QuestionDto::from(question);
    dto.has_responded = has_responded;
    Ok(Json(dto))
}

pub async fn submit_response(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    Path(question_id): Path<Uuid>,
    uri: Uri,
    Json(req): Json<SubmitResponseReq>,
) -> Result<(StatusCode, Json<ResponseOutcomeDto>), ProblemResponse> {
    let outcome = svc
        .submit_response(user_id, question_id, req.response)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

pub async fn leaderboard(
    Extension(svc): Extension<Arc<Service>>,
    Query(params): Query<LeaderboardParams>,
) -> Json<Vec<RankedProfileDto>> {
    debug!(?params, "leaderboard");
    let query = LeaderboardQuery {
        timeframe: params.timeframe.into(),
        search: params.search,
    };
    let ranked = svc.leaderboard(&query).await;
    Json(ranked.into_iter().map(Into::into).collect())
}

pub async fn events(
    Extension(events): Extension<SseBroadcaster<TimeEvent>>,
) -> impl IntoResponse {
    events.sse_response("time")
}

// -------- admin --------

pub async fn reconcile(
    _admin: AdminAccess,
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> ApiResult<ReconcileSummaryDto> {
    let summary = svc
        .reconcile()
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(summary.into()))
}

pub async fn adjust_time(
    _admin: AdminAccess,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
    Json(req): Json<AdjustReq>,
) -> ApiResult<ProfileDto> {
    let profile = svc
        .adjust_time(id, req.delta)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(profile.into()))
}

pub async fn adjust_xp(
    _admin: AdminAccess,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
    Json(req): Json<AdjustReq>,
) -> ApiResult<ProfileDto> {
    let profile = svc
        .adjust_xp(id, req.delta)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(profile.into()))
}

pub async fn create_mission(
    _admin: AdminAccess,
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    Json(req): Json<CreateMissionReq>,
) -> Result<(StatusCode, Json<MissionDto>), ProblemResponse> {
    let mission = svc
        .create_mission(req.into())
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(mission.into())))
}

pub async fn create_question(
    _admin: AdminAccess,
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    Json(req): Json<CreateQuestionReq>,
) -> Result<(StatusCode, Json<QuestionDto>), ProblemResponse> {
    let question = svc
        .create_question(req.into())
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(question.into())))
}
