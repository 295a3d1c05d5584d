//! Hand-assembled OpenAPI 3.1 document for the REST surface.
//!
//! Operations are listed in one table; component schemas come from the DTOs'
//! `ToSchema` derives so the document cannot drift from the wire types.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use super::dto::{
    AdjustReq, BalanceDto, CompletedMissionDto, CreateMissionReq, CreateProfileReq,
    CreateQuestionReq, MissionDto, MissionRewardDto, ProfileDto, QuestionDto, RankDto,
    RankedProfileDto, ReconcileSummaryDto, ResponseOutcomeDto, SubmitResponseReq, TimeEvent,
    TimeframeDto,
};
use super::problem::Problem;

/// Response body shape of an operation.
#[derive(Clone, Copy)]
enum Body {
    None,
    One(&'static str),
    Many(&'static str),
    EventStream,
}

struct Op {
    method: &'static str,
    path: &'static str,
    id: &'static str,
    summary: &'static str,
    tag: &'static str,
    request: Option<&'static str>,
    status: u16,
    response: Body,
    problems: &'static [u16],
    caller: bool,
    admin: bool,
}

const OPS: &[Op] = &[
    Op {
        method: "get",
        path: "/health",
        id: "time_engine.health",
        summary: "Liveness probe",
        tag: "system",
        request: None,
        status: 200,
        response: Body::None,
        problems: &[],
        caller: false,
        admin: false,
    },
    Op {
        method: "post",
        path: "/profiles",
        id: "time_engine.create_profile",
        summary: "Create the caller's profile with seed values",
        tag: "profiles",
        request: Some("CreateProfileReq"),
        status: 201,
        response: Body::One("ProfileDto"),
        problems: &[400, 401, 500],
        caller: true,
        admin: false,
    },
    Op {
        method: "get",
        path: "/profiles/{id}",
        id: "time_engine.get_profile",
        summary: "Profile with decayed balance",
        tag: "profiles",
        request: None,
        status: 200,
        response: Body::One("BalanceDto"),
        problems: &[500, 503],
        caller: false,
        admin: false,
    },
    Op {
        method: "get",
        path: "/profiles/{id}/rank",
        id: "time_engine.get_rank",
        summary: "Current leaderboard rank",
        tag: "profiles",
        request: None,
        status: 200,
        response: Body::One("RankDto"),
        problems: &[404, 500],
        caller: false,
        admin: false,
    },
    Op {
        method: "get",
        path: "/profiles/{id}/missions",
        id: "time_engine.list_completed_missions",
        summary: "Missions completed by a user",
        tag: "missions",
        request: None,
        status: 200,
        response: Body::Many("CompletedMissionDto"),
        problems: &[500],
        caller: false,
        admin: false,
    },
    Op {
        method: "get",
        path: "/missions",
        id: "time_engine.list_missions",
        summary: "Active missions, newest first",
        tag: "missions",
        request: None,
        status: 200,
        response: Body::Many("MissionDto"),
        problems: &[500],
        caller: false,
        admin: false,
    },
    Op {
        method: "post",
        path: "/missions/{id}/complete",
        id: "time_engine.complete_mission",
        summary: "Complete a mission once and collect its rewards",
        tag: "missions",
        request: None,
        status: 200,
        response: Body::One("MissionRewardDto"),
        problems: &[401, 404, 409, 500, 503],
        caller: true,
        admin: false,
    },
    Op {
        method: "get",
        path: "/questions/today",
        id: "time_engine.question_today",
        summary: "Today's question of the day",
        tag: "questions",
        request: None,
        status: 200,
        response: Body::One("QuestionDto"),
        problems: &[404, 500],
        caller: false,
        admin: false,
    },
    Op {
        method: "post",
        path: "/questions/{id}/responses",
        id: "time_engine.submit_response",
        summary: "Answer a question; qualifying answers earn bonus time",
        tag: "questions",
        request: Some("SubmitResponseReq"),
        status: 201,
        response: Body::One("ResponseOutcomeDto"),
        problems: &[400, 401, 404, 500],
        caller: true,
        admin: false,
    },
    Op {
        method: "get",
        path: "/leaderboard",
        id: "time_engine.leaderboard",
        summary: "Ranked profiles by XP",
        tag: "leaderboard",
        request: None,
        status: 200,
        response: Body::Many("RankedProfileDto"),
        problems: &[],
        caller: false,
        admin: false,
    },
    Op {
        method: "get",
        path: "/events",
        id: "time_engine.events",
        summary: "Server-sent stream of time events",
        tag: "events",
        request: None,
        status: 200,
        response: Body::EventStream,
        problems: &[],
        caller: false,
        admin: false,
    },
    Op {
        method: "post",
        path: "/admin/reconcile",
        id: "time_engine.reconcile",
        summary: "Run one reconciliation pass",
        tag: "admin",
        request: None,
        status: 200,
        response: Body::One("ReconcileSummaryDto"),
        problems: &[401, 500, 503],
        caller: false,
        admin: true,
    },
    Op {
        method: "post",
        path: "/admin/profiles/{id}/time",
        id: "time_engine.adjust_time",
        summary: "Apply a signed time delta (clamped at zero)",
        tag: "admin",
        request: Some("AdjustReq"),
        status: 200,
        response: Body::One("ProfileDto"),
        problems: &[401, 404, 500],
        caller: false,
        admin: true,
    },
    Op {
        method: "post",
        path: "/admin/profiles/{id}/xp",
        id: "time_engine.adjust_xp",
        summary: "Apply a signed XP delta (clamped at zero)",
        tag: "admin",
        request: Some("AdjustReq"),
        status: 200,
        response: Body::One("ProfileDto"),
        problems: &[401, 404, 500],
        caller: false,
        admin: true,
    },
    Op {
        method: "post",
        path: "/admin/missions",
        id: "time_engine.create_mission",
        summary: "Create a mission",
        tag: "admin",
        request: Some("CreateMissionReq"),
        status: 201,
        response: Body::One("MissionDto"),
        problems: &[400, 401, 500],
        caller: false,
        admin: true,
    },
    Op {
        method: "post",
        path: "/admin/questions",
        id: "time_engine.create_question",
        summary: "Schedule a question of the day",
        tag: "admin",
        request: Some("CreateQuestionReq"),
        status: 201,
        response: Body::One("QuestionDto"),
        problems: &[400, 401, 500],
        caller: false,
        admin: true,
    },
];

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn header_param(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "header",
        "required": true,
        "description": description,
        "schema": { "type": "string" },
    })
}

fn operation(op: &Op) -> Value {
    let mut params = Vec::new();
    if op.path.contains("{id}") {
        params.push(json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "format": "uuid" },
        }));
    }
    if op.caller {
        params.push(header_param("x-user-id", "Caller profile UUID"));
    }
    if op.admin {
        params.push(header_param("x-admin-token", "Admin shared secret"));
    }
    if op.path == "/leaderboard" {
        params.push(json!({ "name": "timeframe", "in": "query", "required": false, "schema": schema_ref("TimeframeDto") }));
        params.push(json!({ "name": "search", "in": "query", "required": false, "schema": { "type": "string" } }));
    }

    let ok = match op.response {
        Body::None => json!({ "description": "OK" }),
        Body::One(name) => json!({
            "description": "OK",
            "content": { "application/json": { "schema": schema_ref(name) } },
        }),
        Body::Many(name) => json!({
            "description": "OK",
            "content": { "application/json": { "schema": { "type": "array", "items": schema_ref(name) } } },
        }),
        Body::EventStream => json!({
            "description": "Event stream",
            "content": { "text/event-stream": { "schema": schema_ref("TimeEvent") } },
        }),
    };

    let mut responses = Map::new();
    responses.insert(op.status.to_string(), ok);
    for status in op.problems {
        responses.insert(
            status.to_string(),
            json!({
                "description": "Problem",
                "content": { "application/problem+json": { "schema": schema_ref("Problem") } },
            }),
        );
    }

    let mut out = Map::new();
    out.insert("operationId".into(), json!(op.id));
    out.insert("summary".into(), json!(op.summary));
    out.insert("tags".into(), json!([op.tag]));
    if !params.is_empty() {
        out.insert("parameters".into(), Value::Array(params));
    }
    if let Some(req) = op.request {
        out.insert(
            "requestBody".into(),
            json!({
                "required": true,
                "content": { "application/json": { "schema": schema_ref(req) } },
            }),
        );
    }
    out.insert("responses".into(), Value::Object(responses));
    Value::Object(out)
}

fn register<T: ToSchema>(schemas: &mut BTreeMap<String, Value>) {
    let schema = serde_json::to_value(T::schema()).unwrap_or_default();
    schemas.insert(T::name().into_owned(), schema);
}

fn components() -> BTreeMap<String, Value> {
    let mut schemas = BTreeMap::new();
    register::<Problem>(&mut schemas);
    register::<ProfileDto>(&mut schemas);
    register::<BalanceDto>(&mut schemas);
    register::<CreateProfileReq>(&mut schemas);
    register::<RankDto>(&mut schemas);
    register::<MissionDto>(&mut schemas);
    register::<CreateMissionReq>(&mut schemas);
    register::<CompletedMissionDto>(&mut schemas);
    register::<MissionRewardDto>(&mut schemas);
    register::<QuestionDto>(&mut schemas);
    register::<CreateQuestionReq>(&mut schemas);
    register::<SubmitResponseReq>(&mut schemas);
    register::<ResponseOutcomeDto>(&mut schemas);
    register::<TimeframeDto>(&mut schemas);
    register::<RankedProfileDto>(&mut schemas);
    register::<ReconcileSummaryDto>(&mut schemas);
    register::<AdjustReq>(&mut schemas);
    register::<TimeEvent>(&mut schemas);
    schemas
}

/// The complete document served at `/openapi.json`.
pub fn document() -> Value {
    let mut paths: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();
    for op in OPS {
        paths
            .entry(op.path)
            .or_default()
            .insert(op.method.to_string(), operation(op));
    }

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "PlayOps Time Engine",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Time-balance, rewards and leaderboard API",
        },
        "paths": paths,
        "components": { "schemas": components() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reference_resolves() {
        let doc = document();
        let schemas = doc["components"]["schemas"].as_object().unwrap();
        let text = doc.to_string();
        for chunk in text.split("#/components/schemas/").skip(1) {
            let name: String = chunk.chars().take_while(|c| *c != '"').collect();
            assert!(schemas.contains_key(&name), "dangling $ref to {name}");
        }
    }

    #[test]
    fn admin_routes_document_the_token_header() {
        let doc = document();
        let params = doc["paths"]["/admin/reconcile"]["post"]["parameters"]
            .as_array()
            .unwrap();
        assert!(params.iter().any(|p| p["name"] == "x-admin-token"));
        assert_eq!(
            doc["paths"]["/missions/{id}/complete"]["post"]["operationId"],
            "time_engine.complete_mission"
        );
    }
}
