#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use genesis_core::job::Job;
use genesis_core::types::JobId;
use genesis_db::DbPool;
use genesis_fal::{
    GenerationClient, GenerationOutput, GenerationRequest, ProgressSender, QueueStatus,
    QueueUpdate, RemoteError,
};
use genesis_pipeline::{
    EnhanceOutcome, JobOrchestrator, JobStore, OrchestratorConfig, PromptEnhancer,
};

pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42fake-video-payload";

// ---------------------------------------------------------------------------
// Artifact server
// ---------------------------------------------------------------------------

/// Serve `/video` (200 with [`VIDEO_BYTES`]) and `/missing` (404) on a
/// random local port. Returns the base URL.
pub async fn spawn_artifact_server() -> String {
    async fn video() -> impl IntoResponse {
        ([(header::CONTENT_TYPE, "video/mp4")], VIDEO_BYTES)
    }
    async fn missing() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    let app = Router::new()
        .route("/video", get(video))
        .route("/missing", get(missing));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Fake generation client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed { url: String, content_type: String },
    Fail(String),
    /// Never resolves.
    Hang,
}

pub struct FakeClient {
    pub updates: Vec<QueueUpdate>,
    pub outcome: Outcome,
    pub received: Mutex<Vec<GenerationRequest>>,
}

impl FakeClient {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            updates: Vec::new(),
            outcome,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(url: String, content_type: &str) -> Self {
        Self::new(Outcome::Succeed {
            url,
            content_type: content_type.to_string(),
        })
    }

    pub fn with_updates(mut self, updates: Vec<QueueUpdate>) -> Self {
        self.updates = updates;
        self
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.received.lock().unwrap().last().map(|r| r.prompt.clone())
    }
}

#[async_trait]
impl GenerationClient for FakeClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        progress: ProgressSender,
    ) -> Result<GenerationOutput, RemoteError> {
        self.received.lock().unwrap().push(request);
        for update in &self.updates {
            let _ = progress.send(update.clone());
        }
        match &self.outcome {
            Outcome::Succeed { url, content_type } => Ok(GenerationOutput {
                artifact_url: url.clone(),
                content_type: content_type.clone(),
                seed: Some(4242),
                metadata: Some(serde_json::json!({ "request_id": "fake" })),
            }),
            Outcome::Fail(msg) => Err(RemoteError::Generation(msg.clone())),
            Outcome::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

pub fn in_progress(log: &str) -> QueueUpdate {
    QueueUpdate::new(QueueStatus::InProgress).with_logs(vec![log.to_string()])
}

// ---------------------------------------------------------------------------
// Fake enhancers
// ---------------------------------------------------------------------------

pub struct FixedEnhancer(pub EnhanceOutcome);

#[async_trait]
impl PromptEnhancer for FixedEnhancer {
    fn is_available(&self) -> bool {
        true
    }

    async fn enhance(&self, _prompt: &str, _intensity: u8) -> EnhanceOutcome {
        self.0.clone()
    }
}

/// Enhancer that never answers.
pub struct StalledEnhancer;

#[async_trait]
impl PromptEnhancer for StalledEnhancer {
    fn is_available(&self) -> bool {
        true
    }

    async fn enhance(&self, _prompt: &str, _intensity: u8) -> EnhanceOutcome {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Builders and helpers
// ---------------------------------------------------------------------------

pub fn orchestrator(
    output_dir: &Path,
    db: Option<DbPool>,
    client: Arc<FakeClient>,
    enhancer: EnhanceOutcome,
    timeout: Duration,
) -> JobOrchestrator {
    JobOrchestrator::new(
        Arc::new(JobStore::new(output_dir, db)),
        client,
        Arc::new(FixedEnhancer(enhancer)),
        OrchestratorConfig {
            generation_timeout: timeout,
            ..OrchestratorConfig::default()
        },
    )
}

/// Poll until the job reaches a terminal status.
pub async fn wait_terminal(orchestrator: &JobOrchestrator, job_id: JobId) -> Job {
    wait_until(orchestrator, job_id, |job| job.status.is_terminal()).await
}

/// Poll until `predicate` holds, failing the test after five seconds.
pub async fn wait_until<F>(orchestrator: &JobOrchestrator, job_id: JobId, predicate: F) -> Job
where
    F: Fn(&Job) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job = orchestrator.get_status(job_id).await.unwrap();
        if predicate(&job) {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} stuck at {:?} {}%",
            job.status,
            job.progress
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn memory_db() -> DbPool {
    let pool = genesis_db::create_memory_pool().await.unwrap();
    genesis_db::run_migrations(&pool).await.unwrap();
    pool
}
