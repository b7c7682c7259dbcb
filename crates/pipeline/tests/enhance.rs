//! Drives [`OpenAiEnhancer`] against an in-process fake of the
//! chat-completions API.

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use genesis_pipeline::enhance::DEFAULT_OPENAI_MODEL;
use genesis_pipeline::{EnhanceOutcome, OpenAiEnhancer, PromptEnhancer};
use serde_json::{json, Value};

const PROMPT: &str = "A dragon flying over mountains at sunset";

async fn completion(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"message": "bad key"}})));
    }
    assert_eq!(body["model"], DEFAULT_OPENAI_MODEL);
    assert_eq!(body["max_tokens"], 280);
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("intensely cinematic"));
    assert!(body["messages"][1]["content"].as_str().unwrap().contains(PROMPT));

    (
        StatusCode::OK,
        Json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "  A red dragon glides over snowy peaks.  "}}
            ]
        })),
    )
}

async fn server_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": {"message": "overloaded"}})),
    )
}

async fn empty_completion() -> Json<Value> {
    Json(json!({"choices": [{"message": {"role": "assistant", "content": "   "}}]}))
}

async fn spawn_fake() -> String {
    let app = Router::new()
        .route("/ok", post(completion))
        .route("/error", post(server_error))
        .route("/empty", post(empty_completion));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Accept connections and never answer them.
async fn spawn_silent() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

fn enhancer(endpoint: String) -> OpenAiEnhancer {
    OpenAiEnhancer::new(Some("test-key".into()), DEFAULT_OPENAI_MODEL).with_endpoint(endpoint)
}

#[tokio::test]
async fn completion_text_becomes_the_prompt() {
    let base = spawn_fake().await;

    let outcome = enhancer(format!("{base}/ok")).enhance(PROMPT, 8).await;

    assert_eq!(
        outcome,
        EnhanceOutcome::Enhanced("A red dragon glides over snowy peaks.".into())
    );
}

#[tokio::test]
async fn error_status_falls_back() {
    let base = spawn_fake().await;

    let outcome = enhancer(format!("{base}/error")).enhance(PROMPT, 8).await;

    match outcome {
        EnhanceOutcome::Fallback { reason } => assert!(reason.starts_with("HTTP 500"), "{reason}"),
        other => panic!("expected fallback, got {other:?}"),
    }
    assert_eq!(
        EnhanceOutcome::Fallback { reason: String::new() }.into_prompt(PROMPT),
        PROMPT
    );
}

#[tokio::test]
async fn rejected_key_falls_back() {
    let base = spawn_fake().await;
    let enhancer = OpenAiEnhancer::new(Some("wrong".into()), DEFAULT_OPENAI_MODEL)
        .with_endpoint(format!("{base}/ok"));

    let outcome = enhancer.enhance(PROMPT, 8).await;

    assert!(matches!(outcome, EnhanceOutcome::Fallback { reason } if reason.starts_with("HTTP 401")));
}

#[tokio::test]
async fn blank_completion_falls_back() {
    let base = spawn_fake().await;

    let outcome = enhancer(format!("{base}/empty")).enhance(PROMPT, 8).await;

    assert_eq!(
        outcome,
        EnhanceOutcome::Fallback {
            reason: "empty completion".into()
        }
    );
}

#[tokio::test]
async fn silent_endpoint_times_out() {
    let base = spawn_silent().await;
    let enhancer = enhancer(format!("{base}/ok")).with_timeout(Duration::from_millis(100));

    let started = tokio::time::Instant::now();
    let outcome = enhancer.enhance(PROMPT, 8).await;

    assert!(matches!(outcome, EnhanceOutcome::Fallback { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}
