mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use genevision::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let (config, _root) = common::test_config();
    let shared = SharedState::with_collaborators(config, common::collaborators())
        .await
        .expect("failed to create shared state");
    let state = genevision::api::create_app_state(Arc::new(shared), None);
    genevision::api::router(state).await
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Register and log in, returning the session cookie.
async fn login(app: &Router, username: &str) -> String {
    let email = format!("{username}@example.org");
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "password": common::PASSWORD,
            "confirm_password": common::PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": email, "password": common::PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn upload(app: &Router, cookie: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/pipeline/upload",
        Some(cookie),
        Some(json!({ "name": "fragment", "content": common::INPUT })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["sequence"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = spawn_app().await;

    for uri in ["/api/pipeline", "/api/sequences", "/api/history", "/api/auth/me"] {
        let (status, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["success"], false);
    }

    let (status, _) = send(&app, "GET", "/api/system/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = spawn_app().await;
    login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.org", "password": "wrong12!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "al",
            "email": "not-an-email",
            "password": "short",
            "confirm_password": "other",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_session_pipeline_flow() {
    let app = spawn_app().await;
    let cookie = login(&app, "alice").await;

    let (status, body) = send(&app, "GET", "/api/pipeline", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_step"], 0);
    assert_eq!(body["data"]["can_advance"], false);

    let (status, _) = send(&app, "POST", "/api/pipeline/advance", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/api/pipeline/retreat", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_step"], 0);

    let sequence_id = upload(&app, &cookie).await;

    let (_, body) = send(&app, "GET", "/api/pipeline", Some(&cookie), None).await;
    assert_eq!(body["data"]["sequence_id"], sequence_id);
    assert_eq!(body["data"]["can_advance"], true);

    let (status, body) = send(&app, "POST", "/api/pipeline/advance", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_step"], 1);

    // Incomplete step blocks advancing
    let (status, _) = send(&app, "POST", "/api/pipeline/advance", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for expected in 1..=4 {
        let (status, body) = send(&app, "POST", "/api/pipeline/run", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["run"]["step"], expected);
        assert_eq!(body["data"]["run"]["newly_completed"], true);
        let (status, _) = send(&app, "POST", "/api/pipeline/advance", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        "GET",
        "/api/pipeline/annotations/g1?threshold=0.9",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "GET",
        "/api/pipeline/annotations/g1?threshold=1.5",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/pipeline/models", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, "POST", "/api/pipeline/final", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["summary"]["gene_count"], 3);
    assert_eq!(body["data"]["session"]["final_results_saved"], true);

    let (status, body) = send(&app, "POST", "/api/pipeline/report", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let report_id = body["data"]["report"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["session"]["report_id"], report_id);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/reports/{report_id}/download"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"genevision_report_")
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Number of predicted genes: 3"));

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/sequences/{sequence_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/sequences/{sequence_id}/results"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_failed_run_reports_diagnostic() {
    let (config, _root) = common::test_config();
    let shared = SharedState::with_collaborators(
        config,
        common::collaborators_with(Arc::new(common::BrokenAugustus)),
    )
    .await
    .unwrap();
    let app = genevision::api::router(genevision::api::create_app_state(Arc::new(shared), None))
        .await;
    let cookie = login(&app, "alice").await;

    upload(&app, &cookie).await;
    send(&app, "POST", "/api/pipeline/advance", Some(&cookie), None).await;

    let (status, body) = send(&app, "POST", "/api/pipeline/run", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("species human not found")
    );

    let (_, body) = send(&app, "GET", "/api/pipeline", Some(&cookie), None).await;
    assert_eq!(body["data"]["completed_steps"], json!([]));
}

#[tokio::test]
async fn test_upload_rejects_invalid_sequence() {
    let app = spawn_app().await;
    let cookie = login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/pipeline/upload",
        Some(&cookie),
        Some(json!({ "content": "ACGTXYZ" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = send(&app, "GET", "/api/sequences", Some(&cookie), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_delete_sequence_clears_session() {
    let app = spawn_app().await;
    let cookie = login(&app, "alice").await;

    let sequence_id = upload(&app, &cookie).await;
    send(&app, "POST", "/api/pipeline/advance", Some(&cookie), None).await;
    let (status, _) = send(&app, "POST", "/api/pipeline/run", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/sequences/{sequence_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/pipeline", Some(&cookie), None).await;
    assert_eq!(body["data"]["sequence_id"], Value::Null);
    assert_eq!(body["data"]["current_step"], 0);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/sequences/{sequence_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/sequences/{sequence_id}/results"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sequences_are_scoped_to_owner() {
    let app = spawn_app().await;
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;

    let sequence_id = upload(&app, &alice).await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/sequences/{sequence_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/sequences", Some(&bob), None).await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = send(&app, "GET", "/api/sequences", Some(&alice), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0].get("content").is_none());
}

#[tokio::test]
async fn test_history_endpoints() {
    let app = spawn_app().await;
    let cookie = login(&app, "alice").await;
    upload(&app, &cookie).await;

    let (status, body) = send(&app, "GET", "/api/history", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries[0]["action_type"], "sequence_upload");
    assert!(entries.iter().any(|e| e["action_type"] == "user_create"));

    let (_, body) = send(
        &app,
        "GET",
        "/api/history?action_types=user_create",
        Some(&cookie),
        None,
    )
    .await;
    let filtered = body["data"].as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    let entry_id = filtered[0]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "GET",
        "/api/history?start_date=2026-02-10&end_date=2026-02-01",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/history/summary", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_sequences"], 1);
    assert_eq!(body["data"]["completed_sequences"], 0);

    let (status, body) = send(&app, "GET", "/api/history/stats", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/history/{entry_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/history/{entry_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = spawn_app().await;
    let cookie = login(&app, "alice").await;

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
