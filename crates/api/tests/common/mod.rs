#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get as route_get;
use axum::Router;
use genesis_api::config::ServerConfig;
use genesis_api::middleware::rate_limit::RateLimiter;
use genesis_api::router::build_app_router;
use genesis_api::state::AppState;
use genesis_fal::{
    GenerationClient, GenerationOutput, GenerationRequest, ProgressSender, RemoteError,
};
use genesis_pipeline::{DisabledEnhancer, JobOrchestrator, JobStore};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const VIDEO_BYTES: &[u8] = b"not-really-a-webm-but-close-enough";
pub const INDEX_HTML: &str = "<!doctype html><title>Neural Genesis</title>";

/// Build a test `ServerConfig` rooted in `dir`.
pub fn test_config(dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        output_dir: dir.join("generated"),
        uploads_dir: dir.join("uploads"),
        static_dir: dir.join("public"),
        database_url: "sqlite::memory:".to_string(),
        fal_key: Some("test".to_string()),
        fal_model_id: "fal-ai/ltx-video".to_string(),
        fal_queue_url: "http://127.0.0.1:9".to_string(),
        fal_poll_interval_ms: 10,
        openai_api_key: None,
        openai_model: "gpt-3.5-turbo".to_string(),
        generation_timeout_secs: 30,
        rate_limit_max: 10,
        rate_limit_window_secs: 900,
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Serve [`VIDEO_BYTES`] at `/video.webm` on a random local port.
pub async fn spawn_artifact_server() -> String {
    async fn video() -> impl IntoResponse {
        ([(header::CONTENT_TYPE, "video/webm")], VIDEO_BYTES)
    }

    let app = Router::new().route("/video.webm", route_get(video));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Generation client that either points at an artifact URL or never finishes.
pub struct FakeClient {
    pub artifact_url: Option<String>,
}

#[async_trait]
impl GenerationClient for FakeClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        _request: GenerationRequest,
        _progress: ProgressSender,
    ) -> Result<GenerationOutput, RemoteError> {
        match &self.artifact_url {
            Some(url) => Ok(GenerationOutput {
                artifact_url: url.clone(),
                content_type: "video/webm".to_string(),
                seed: Some(7),
                metadata: None,
            }),
            None => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub dir: tempfile::TempDir,
    pub orchestrator: JobOrchestrator,
}

/// Build the full application router, mirroring `main.rs`.
///
/// `artifact_url` of `None` makes every generation hang until cancelled.
pub async fn build_test_app(artifact_url: Option<String>, rate_limit_max: u32) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.rate_limit_max = rate_limit_max;

    std::fs::create_dir_all(&config.static_dir).unwrap();
    std::fs::write(config.static_dir.join("index.html"), INDEX_HTML).unwrap();

    let pool = genesis_db::create_memory_pool().await.unwrap();
    genesis_db::run_migrations(&pool).await.unwrap();

    let store = Arc::new(JobStore::new(&config.output_dir, Some(pool.clone())));
    let orchestrator = JobOrchestrator::new(
        store,
        Arc::new(FakeClient { artifact_url }),
        Arc::new(DisabledEnhancer),
        config.orchestrator_config(),
    );

    let state = AppState {
        pool: Some(pool),
        config: Arc::new(config.clone()),
        orchestrator: orchestrator.clone(),
        rate_limiter: Arc::new(RateLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        )),
    };

    TestApp {
        router: build_app_router(state, &config),
        dir,
        orchestrator,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> axum::response::Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit a valid prompt and return the job id.
pub async fn submit(app: &Router) -> String {
    let response = post_json(
        app,
        "/api/generate/text-to-video",
        serde_json::json!({ "prompt": "A dragon flying over mountains at sunset" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["jobId"].as_str().unwrap().to_string()
}

/// Poll the status route until `status` is reached.
pub async fn wait_for_status(app: &Router, job_id: &str, status: &str) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let json = body_json(get(app, &format!("/api/job/{job_id}/status")).await).await;
        if json["status"] == status {
            return json;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} never reached {status}: {json}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
