//! End-to-end learner flow over HTTP with a file token store

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use learnloop::api::{HttpApi, LoginPayload};
use learnloop::flow::{Action, Flow, FlowContext, Phase};
use learnloop::session::{FileTokenStore, TokenStore};

fn profile() -> serde_json::Value {
    json!({
        "id": "u1",
        "user_id": "alice",
        "name": "Alice",
        "level": "beginner",
        "created_at": "2024-01-01T00:00:00"
    })
}

/// Mount every endpoint a full session touches
async fn mount_service(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(200)
                .json_body(json!({"access_token": "tok-1", "token_type": "bearer"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me").header("authorization", "Bearer tok-1");
            then.status(200).json_body(profile());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/exercises/initial");
            then.status(200).json_body(json!([{
                "id": "e1",
                "skill_id": "fractions",
                "prompt": "1/2 + 1/2 = ?",
                "difficulty": "easy",
                "options": ["1", "2"],
                "answer": "1"
            }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/students/alice/history");
            then.status(200).json_body(json!([{
                "id": "i1",
                "user_id": "alice",
                "exercise_id": "e1",
                "skill_id": "fractions",
                "correct": true,
                "timestamp": "2024-05-02T08:30:00",
                "probability_before": 0.3,
                "probability_after": 0.75
            }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/interactions/");
            then.status(201).json_body(json!({
                "id": "i1",
                "user_id": "alice",
                "exercise_id": "e1",
                "skill_id": "fractions",
                "correct": true,
                "timestamp": "2024-05-02T08:30:00",
                "probability_before": 0.3,
                "probability_after": 0.75
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/recommendations/next")
                .query_param("user_id", "alice");
            then.status(200).json_body(json!({
                "user_id": "alice",
                "exercise_id": "e7",
                "skill_id": "fractions",
                "prompt": "3/4 - 1/4 = ?",
                "options": ["1/2", "1/4"],
                "answer": "1/2",
                "probability": 0.75,
                "difficulty": "medium",
                "mastery": true
            }));
        })
        .await;
}

fn flow(server: &MockServer, store: &FileTokenStore) -> Flow {
    let api = Arc::new(HttpApi::new(&server.base_url(), Duration::from_secs(5)).unwrap());
    Flow::new(FlowContext::new(api, Arc::new(store.clone())))
}

#[tokio::test]
async fn test_login_calibrate_recommend_logout() {
    let server = MockServer::start_async().await;
    mount_service(&server).await;
    let logout = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/logout").header("authorization", "Bearer tok-1");
            then.status(200).json_body(json!({"detail": "ok"}));
        })
        .await;

    let temp = TempDir::new().unwrap();
    let store = FileTokenStore::new(temp.path().join("token"));

    let mut flow = flow(&server, &store);
    flow.dispatch(Action::RestoreSession).await;
    assert_eq!(flow.state().phase(), Phase::Unauthenticated);

    flow.dispatch(Action::Login(LoginPayload {
        user_id: "alice".to_string(),
        password: "pw".to_string(),
    }))
    .await;
    assert_eq!(flow.state().phase(), Phase::Calibration { index: 0, total: 1 });
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-1"));

    flow.dispatch(Action::Answer("1".to_string())).await;
    let state = flow.state();
    assert_eq!(state.phase(), Phase::Recommendation);
    assert_eq!(state.current_exercise().map(|e| e.id.as_str()), Some("e7"));
    assert_eq!(
        state.mastery_message.as_deref(),
        Some("Skill fractions mastered, well done!")
    );
    assert_eq!(state.progress()[0].latest_probability, Some(0.75));
    assert!(state.error.is_none());

    flow.dispatch(Action::Logout).await;
    logout.assert_async().await;
    assert_eq!(flow.state().phase(), Phase::Unauthenticated);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn test_restore_from_token_file() {
    let server = MockServer::start_async().await;
    mount_service(&server).await;

    let temp = TempDir::new().unwrap();
    let store = FileTokenStore::new(temp.path().join("nested").join("token"));
    store.save("tok-1").unwrap();

    let mut flow = flow(&server, &store);
    flow.dispatch(Action::RestoreSession).await;

    assert_eq!(flow.state().user_id(), Some("alice"));
    assert_eq!(flow.state().history.len(), 1);
    assert_eq!(flow.state().phase(), Phase::Calibration { index: 0, total: 1 });
}

#[tokio::test]
async fn test_expired_token_is_removed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(401).json_body(json!({"detail": "Token expired"}));
        })
        .await;

    let temp = TempDir::new().unwrap();
    let store = FileTokenStore::new(temp.path().join("token"));
    store.save("old").unwrap();

    let mut flow = flow(&server, &store);
    flow.dispatch(Action::RestoreSession).await;

    assert_eq!(flow.state().phase(), Phase::Unauthenticated);
    assert_eq!(
        flow.state().auth_error.as_deref(),
        Some("Session expired, please log in again.")
    );
    assert!(!temp.path().join("token").exists());
}
