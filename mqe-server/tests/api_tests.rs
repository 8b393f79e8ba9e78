//! HTTP API integration tests
//!
//! Drive the axum router with `oneshot` requests against a temporary database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mqe_common::events::EventBus;
use mqe_server::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

async fn create_test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = mqe_common::db::init_database(&dir.path().join("mqe.db"))
        .await
        .expect("Failed to initialize database");
    let state = AppState::new(pool, EventBus::new(100));
    (build_router(state), dir)
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn register(app: &Router, username: &str) -> Uuid {
    let (status, body) = send(app, "POST", "/api/users", None, Some(json!({"username": username}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().parse().unwrap()
}

/// Returns (meeting_id, creator, p2, p3)
async fn setup_meeting(app: &Router) -> (Uuid, Uuid, Uuid, Uuid) {
    let creator = register(app, "creator").await;
    let p2 = register(app, "p2").await;
    let p3 = register(app, "p3").await;
    let (status, body) = send(
        app,
        "POST",
        "/api/meetings",
        Some(creator),
        Some(json!({
            "title": "Quarterly review",
            "question": "Are we on track?",
            "participant_ids": [p2, p3]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let meeting_id = body["id"].as_str().unwrap().parse().unwrap();
    (meeting_id, creator, p2, p3)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = create_test_app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mqe-server");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let (app, _dir) = create_test_app().await;
    let (status, body) = send(&app, "GET", "/api/meetings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_create_and_get_meeting() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, creator, p2, _) = setup_meeting(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/meetings/{}", meeting_id), Some(p2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_phase"], "emotional_evaluation");
    assert_eq!(body["creator_id"], creator.to_string());
    assert_eq!(body["participants"].as_array().unwrap().len(), 3);
    assert_eq!(body["participants"][0]["is_creator"], true);

    let (status, body) = send(&app, "GET", "/api/meetings", Some(creator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_meeting_is_not_found() {
    let (app, _dir) = create_test_app().await;
    let user = register(&app, "someone").await;
    let (status, body) = send(&app, "GET", &format!("/api/meetings/{}", Uuid::new_v4()), Some(user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_submission_flow() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, creator, p2, p3) = setup_meeting(&app).await;
    let submissions = format!("/api/meetings/{}/submissions", meeting_id);

    let (status, body) = send(
        &app,
        "POST",
        &submissions,
        Some(p2),
        Some(json!({
            "phase": "emotional_evaluation",
            "data": [
                {"target_participant_id": creator, "emotional_scale": 60, "is_toxic": false},
                {"target_participant_id": p3, "emotional_scale": -20, "is_toxic": true}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["submission"]["phase"], "emotional_evaluation");
    assert_eq!(body["submission"]["revision"], 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("{}/emotional_evaluation", submissions),
        Some(p2),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][1]["is_toxic"], true);

    let (status, body) = send(&app, "GET", &format!("/api/meetings/{}/voting", meeting_id), Some(creator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_participants"], 3);
    assert_eq!(body["submitted_participant_ids"], json!([p2]));

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/meetings/{}/voting/pending", meeting_id),
        Some(creator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_validation_error_is_unprocessable() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, creator, p2, p3) = setup_meeting(&app).await;

    let (status, _) = send(&app, "POST", &format!("/api/meetings/{}/advance", meeting_id), Some(creator), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/meetings/{}/submissions", meeting_id),
        Some(creator),
        Some(json!({
            "phase": "understanding_contribution",
            "data": {
                "understanding_score": 70,
                "contributions": [
                    {"participant_id": p2, "contribution_percentage": 40},
                    {"participant_id": p3, "contribution_percentage": 55}
                ]
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INCOMPLETE_CONTRIBUTION_SET");
}

#[tokio::test]
async fn test_phase_endpoints() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, creator, p2, _) = setup_meeting(&app).await;
    let advance = format!("/api/meetings/{}/advance", meeting_id);
    let phase = format!("/api/meetings/{}/phase", meeting_id);

    let (status, body) = send(&app, "POST", &advance, Some(p2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_CREATOR");

    let (status, body) = send(&app, "POST", &advance, Some(creator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_phase"], "understanding_contribution");

    let (status, body) = send(&app, "PUT", &phase, Some(creator), Some(json!({"phase": "emotional_evaluation"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let (status, body) = send(&app, "PUT", &phase, Some(creator), Some(json!({"phase": "task_planning"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_phase"], "task_planning");

    let (status, body) = send(&app, "GET", &format!("/api/meetings/{}/history", meeting_id), Some(p2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", &format!("/api/meetings/{}/report", meeting_id), Some(creator), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MEETING_NOT_FINISHED");
}

#[tokio::test]
async fn test_task_endpoints() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, creator, p2, p3) = setup_meeting(&app).await;
    for _ in 0..2 {
        send(&app, "POST", &format!("/api/meetings/{}/advance", meeting_id), Some(creator), None).await;
    }

    let deadline = (mqe_common::time::today() + chrono::Days::new(3)).to_string();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/meetings/{}/submissions", meeting_id),
        Some(p2),
        Some(json!({
            "phase": "task_planning",
            "data": {
                "task_description": "Prepare the demo",
                "common_question": "Is it ready?",
                "deadline": deadline,
                "expected_contribution_percentage": 30,
                "emotional_scale": 75
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = body["task"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["task"]["approved"], false);

    let evaluable = format!("/api/meetings/{}/tasks/evaluable", meeting_id);
    let (_, body) = send(&app, "GET", &evaluable, Some(p3), None).await;
    assert!(body.as_array().unwrap().is_empty());

    let approve = format!("/api/tasks/{}/approve", task_id);
    let (status, _) = send(&app, "POST", &approve, Some(p3), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "POST", &approve, Some(creator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], true);

    let (_, body) = send(&app, "GET", &evaluable, Some(p3), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/tasks/{}", task_id),
        Some(p2),
        Some(json!({"description": "Prepare and record the demo"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Prepare and record the demo");
    assert_eq!(body["approved"], true);

    let (status, body) = send(&app, "GET", "/api/tasks", Some(p2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/meetings/{}/analytics/tasks", meeting_id),
        Some(creator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["evaluation_count"], 0);
    assert!(body[0]["average"].is_null());
}

#[tokio::test]
async fn test_malformed_phase_path_is_bad_request() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, creator, _, _) = setup_meeting(&app).await;
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/meetings/{}/submissions/voting", meeting_id),
        Some(creator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_finished_report_export() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, creator, p2, p3) = setup_meeting(&app).await;

    send(
        &app,
        "POST",
        &format!("/api/meetings/{}/submissions", meeting_id),
        Some(p3),
        Some(json!({
            "phase": "emotional_evaluation",
            "data": [
                {"target_participant_id": creator, "emotional_scale": 10},
                {"target_participant_id": p2, "emotional_scale": 30}
            ]
        })),
    )
    .await;
    for _ in 0..4 {
        send(&app, "POST", &format!("/api/meetings/{}/advance", meeting_id), Some(creator), None).await;
    }

    let (status, body) = send(&app, "GET", &format!("/api/meetings/{}/report", meeting_id), Some(p2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meeting"]["current_phase"], "finished");
    assert_eq!(body["phases"].as_array().unwrap().len(), 4);
    assert_eq!(body["phases"][0]["submissions"].as_array().unwrap().len(), 1);
    assert_eq!(body["phase_history"].as_array().unwrap().len(), 4);

    let p2_stats = body["participant_analytics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["username"] == "p2")
        .unwrap()
        .clone();
    assert_eq!(p2_stats["emotional_received"]["average"], 30.0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/meetings/{}/submissions", meeting_id),
        Some(p3),
        Some(json!({"phase": "emotional_evaluation", "data": []})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MEETING_FINISHED");
}

#[tokio::test]
async fn test_event_stream_requires_participation() {
    let (app, _dir) = create_test_app().await;
    let (meeting_id, _, _, _) = setup_meeting(&app).await;
    let outsider = register(&app, "outsider").await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/meetings/{}/events", meeting_id),
        Some(outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_A_PARTICIPANT");
}
