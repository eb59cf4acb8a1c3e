//! Guess-session lifecycle over HTTP.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use tower::ServiceExt;
use whatref_core::{defaults, HistoryStore};
use whatref_inference::{MockFailure, MockVisionBackend};

async fn create(app: &TestApp) -> serde_json::Value {
    let response = app
        .send(MultipartBody::new().image(&png(48, 48)).post("/api/sessions"))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

fn guess_again_uri(session: &serde_json::Value) -> String {
    format!("/api/sessions/{}/guess-again", session["id"].as_str().unwrap())
}

#[tokio::test]
async fn test_create_runs_first_attempt_and_records_history() {
    let app = TestApp::new(MockVisionBackend::new().with_answer(ROLEX_ANSWER));

    let session = create(&app).await;
    assert_eq!(session["state"], "analyzed");
    assert_eq!(session["attemptCount"], 0);
    assert_eq!(session["attemptsLeft"], 3);
    assert_eq!(session["priorGuesses"], json!([]));
    assert_eq!(session["currentResult"]["rawText"], ROLEX_ANSWER);
    assert_eq!(session["currentResult"]["isFailure"], false);

    let history = app.history.list(None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result, ROLEX_ANSWER);
    assert!(history[0].thumbnail.as_deref().unwrap().starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_refusal_is_shown_as_fallback_and_not_recorded() {
    let app = TestApp::new(MockVisionBackend::new().with_answer(REFUSAL_ANSWER));

    let session = create(&app).await;
    assert_eq!(session["currentResult"]["isFailure"], true);
    assert_eq!(session["currentResult"]["displayText"], defaults::FALLBACK_MESSAGE);
    assert!(app.history.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_three_retries_then_limit() {
    let app = TestApp::new(
        MockVisionBackend::new()
            .with_answer("1. Reference Number: 116500LN")
            .with_answer("1. Reference Number: 16520")
            .with_answer("1. Reference Number: 116520")
            .with_answer("1. Reference Number: 126500LN"),
    );
    let session = create(&app).await;
    let uri = guess_again_uri(&session);

    for expected in 1..=3 {
        let response = app.send(post_json(&uri, json!({}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["attemptCount"], expected);
    }

    let response = app.send(post_json(&uri, json!({}))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"], defaults::GUESS_LIMIT_MESSAGE);
    assert_eq!(body["errorType"], "GuessLimitReached");

    let view = json_body(
        app.send(get(&format!("/api/sessions/{}", session["id"].as_str().unwrap())))
            .await,
    )
    .await;
    assert_eq!(view["state"], "exhausted");
    assert_eq!(view["attemptCount"], 3);
    assert_eq!(view["attemptsLeft"], 0);
    assert_eq!(
        view["priorGuesses"],
        json!([
            "1. Reference Number: 116500LN",
            "1. Reference Number: 16520",
            "1. Reference Number: 116520"
        ])
    );
    // The rejected request never reached the backend.
    assert_eq!(app.backend.call_count(), 4);
}

#[tokio::test]
async fn test_retry_prompt_carries_guesses_and_hint() {
    let app = TestApp::new(MockVisionBackend::new().with_answer(ROLEX_ANSWER));
    let session = create(&app).await;

    let response = app
        .send(post_json(
            &guess_again_uri(&session),
            json!({ "userInfo": "Blue dial, bought in Geneva" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["userHint"], "Blue dial, bought in Geneva");

    let prompts = app.backend.prompts();
    assert!(prompts[1].contains(&format!("1. {}", ROLEX_ANSWER)));
    assert!(prompts[1].contains("Blue dial, bought in Geneva"));
}

#[tokio::test]
async fn test_guess_again_without_body() {
    let app = TestApp::new(MockVisionBackend::new());
    let session = create(&app).await;

    let response = app.send(post_empty(&guess_again_uri(&session))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["attemptCount"], 1);
}

#[tokio::test]
async fn test_malformed_guess_again_body_is_rejected() {
    let app = TestApp::new(MockVisionBackend::new());
    let session = create(&app).await;
    let uri = guess_again_uri(&session);

    for body in [r#"{"userInfo": "#, r#"{"userInfo": 5}"#, "gold bezel"] {
        let response = app.send(post_raw(&uri, "application/json", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await;
        assert_eq!(error["errorType"], "ValidationError");
        assert!(error["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }
    assert_eq!(app.backend.call_count(), 1);

    let uri = format!("/api/sessions/{}", session["id"].as_str().unwrap());
    assert_eq!(json_body(app.send(get(&uri)).await).await["attemptCount"], 0);
}

#[tokio::test]
async fn test_invalid_session_id_is_json_bad_request() {
    let app = TestApp::new(MockVisionBackend::new());

    let response = app.send(get("/api/sessions/not-a-uuid")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["errorType"], "ValidationError");

    let response = app
        .send(post_json("/api/sessions/not-a-uuid/guess-again", json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.backend.call_count(), 0);
}

#[tokio::test]
async fn test_failed_retry_leaves_session_unchanged() {
    let app = TestApp::new(
        MockVisionBackend::new()
            .with_answer(ROLEX_ANSWER)
            .with_failure(MockFailure::Network),
    );
    let session = create(&app).await;

    let response = app.send(post_json(&guess_again_uri(&session), json!({}))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Failed to analyze image");
    assert_eq!(body["errorType"], "NetworkError");

    let view = json_body(
        app.send(get(&format!("/api/sessions/{}", session["id"].as_str().unwrap())))
            .await,
    )
    .await;
    assert_eq!(view["state"], "analyzed");
    assert_eq!(view["attemptCount"], 0);
    assert_eq!(view["priorGuesses"], json!([]));
    assert_eq!(view["currentResult"]["rawText"], ROLEX_ANSWER);
}

#[tokio::test]
async fn test_concurrent_guess_again_is_busy() {
    let app = TestApp::new(MockVisionBackend::new().with_latency(Duration::from_millis(300)));
    let session = create(&app).await;
    let uri = guess_again_uri(&session);

    let first = tokio::spawn(app.router.clone().oneshot(post_json(&uri, json!({}))));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = app.send(post_json(&uri, json!({}))).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(second).await["errorType"], "SessionBusy");

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(json_body(first).await["attemptCount"], 1);
}

#[tokio::test]
async fn test_create_failure_registers_nothing() {
    let app = TestApp::new(MockVisionBackend::new().unconfigured());

    let response = app
        .send(MultipartBody::new().image(&png(32, 32)).post("/api/sessions"))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "OpenAI API key is not configured"
    );
    assert_eq!(app.state.sessions.len().await, 0);
}

#[tokio::test]
async fn test_replace_image_starts_over() {
    let app = TestApp::new(MockVisionBackend::new());
    let session = create(&app).await;
    let id = session["id"].as_str().unwrap();

    app.send(post_json(&guess_again_uri(&session), json!({ "userInfo": "gold" })))
        .await;

    let response = app
        .send(
            MultipartBody::new()
                .image(&png(20, 30))
                .post(&format!("/api/sessions/{id}/image")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], id);
    assert_eq!(body["attemptCount"], 0);
    assert_eq!(body["priorGuesses"], json!([]));
    assert_eq!(body["userHint"], "");
}

#[tokio::test]
async fn test_unknown_and_deleted_sessions() {
    let app = TestApp::new(MockVisionBackend::new());
    let missing = format!("/api/sessions/{}", uuid::Uuid::now_v7());

    let response = app.send(get(&missing)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["errorType"], "NotFound");

    let response = app.send(post_json(&format!("{missing}/guess-again"), json!({}))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let session = create(&app).await;
    let uri = format!("/api/sessions/{}", session["id"].as_str().unwrap());
    assert_eq!(app.send(delete(&uri)).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.send(delete(&uri)).await.status(), StatusCode::NO_CONTENT);
}
