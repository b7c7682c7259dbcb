//! Job orchestration: one background run per submitted prompt.
//!
//! [`JobOrchestrator::submit`] records a queued job and spawns its run;
//! it never waits for generation. A run goes through:
//!
//! 1. `processing` at 0%, optional prompt enhancement (never fatal);
//! 2. 10%, the remote generation call, bounded by a deadline; queue
//!    updates are normalized into progress in arrival order;
//! 3. 90%, artifact download;
//! 4. `completed` with the artifact path and URL.
//!
//! Any error ends the job as `failed`, `timed_out` or `cancelled`, and is
//! only observable through later status queries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use genesis_core::artifact::artifact_url;
use genesis_core::job::{Job, JobStatus, JobUpdate};
use genesis_core::params::{style_intensity_or_default, BackendParams};
use genesis_core::progress;
use genesis_core::types::{new_job_id, JobId};
use genesis_fal::{GenerationClient, GenerationRequest, QueueUpdate, RemoteError};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::enhance::{EnhanceOutcome, PromptEnhancer};
use crate::error::JobError;
use crate::fetcher::{ArtifactFetcher, FetchError};
use crate::store::JobStore;

/// Default deadline on the remote generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(900);
/// Default deadline on prompt enhancement.
pub const DEFAULT_ENHANCEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Progress reported while submitting to the backend.
const SUBMIT_PROGRESS: u8 = 10;
/// Progress reported while downloading the artifact.
const DOWNLOAD_PROGRESS: u8 = 90;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub generation_timeout: Duration,
    /// Past this, the original prompt is used.
    pub enhancement_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            enhancement_timeout: DEFAULT_ENHANCEMENT_TIMEOUT,
        }
    }
}

/// User-facing generation knobs. Unknown values fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub quality: Option<String>,
    pub style_intensity: Option<i64>,
}

/// Why a run did not complete.
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Failed to download generated video: {0}")]
    Download(#[from] FetchError),

    #[error("remote generation exceeded the {0:?} deadline")]
    TimedOut(Duration),

    #[error("{0}")]
    Cancelled(&'static str),
}

impl RunError {
    fn status(&self) -> JobStatus {
        match self {
            Self::TimedOut(_) => JobStatus::TimedOut,
            Self::Cancelled(_) => JobStatus::Cancelled,
            Self::Remote(_) | Self::Download(_) => JobStatus::Failed,
        }
    }
}

const CANCELLED_BY_REQUEST: &str = "cancelled by request";
const CANCELLED_BY_SHUTDOWN: &str = "server shutting down";

/// Owns the job state machine and the background runs.
#[derive(Clone)]
pub struct JobOrchestrator {
    store: Arc<JobStore>,
    client: Arc<dyn GenerationClient>,
    enhancer: Arc<dyn PromptEnhancer>,
    fetcher: Arc<ArtifactFetcher>,
    config: OrchestratorConfig,
    runs: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        client: Arc<dyn GenerationClient>,
        enhancer: Arc<dyn PromptEnhancer>,
        config: OrchestratorConfig,
    ) -> Self {
        let fetcher = Arc::new(ArtifactFetcher::new(store.output_dir()));
        Self {
            store,
            client,
            enhancer,
            fetcher,
            config,
            runs: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn generation_available(&self) -> bool {
        self.client.is_configured()
    }

    pub fn enhancement_available(&self) -> bool {
        self.enhancer.is_available()
    }

    /// Record a queued job and start its run in the background.
    ///
    /// Returns as soon as the job is registered. `prompt` is expected to
    /// be validated already.
    pub async fn submit(&self, prompt: String, options: SubmitOptions) -> JobId {
        let job_id = new_job_id();
        let cancel = self.shutdown.child_token();

        self.store.insert(Job::queued(job_id, Utc::now())).await;
        self.runs.lock().await.insert(job_id, cancel.clone());

        tracing::info!(
            job_id = %job_id,
            prompt_len = prompt.len(),
            quality = ?options.quality,
            style_intensity = ?options.style_intensity,
            "Job submitted",
        );

        let this = self.clone();
        self.tracker.spawn(async move {
            this.run(job_id, prompt, options, cancel).await;
        });

        job_id
    }

    /// Current snapshot of a job, recovering it from storage if needed.
    pub async fn get_status(&self, job_id: JobId) -> Result<Job, JobError> {
        self.store.lookup(job_id).await
    }

    /// Local path of a completed job's artifact.
    pub async fn get_artifact_path(&self, job_id: JobId) -> Result<PathBuf, JobError> {
        let job = self.store.lookup(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(JobError::NotReady(job_id));
        }

        let path = job.artifact_path.ok_or(JobError::ArtifactMissing(job_id))?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => {
                tracing::warn!(job_id = %job_id, path = %path.display(), "Recorded artifact is missing");
                Err(JobError::ArtifactMissing(job_id))
            }
        }
    }

    /// Cancel a running job.
    ///
    /// The job is marked `cancelled` immediately; its run stops at the
    /// next await point and discards any partial download.
    pub async fn cancel(&self, job_id: JobId) -> Result<Job, JobError> {
        let job = self.store.lookup(job_id).await?;
        if job.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(job_id));
        }

        let snapshot = self
            .store
            .apply(job_id, JobUpdate::ended(JobStatus::Cancelled, CANCELLED_BY_REQUEST))
            .await
            .ok_or(JobError::AlreadyTerminal(job_id))?;

        if let Some(token) = self.runs.lock().await.remove(&job_id) {
            token.cancel();
        }
        tracing::info!(job_id = %job_id, "Job cancelled");
        Ok(snapshot)
    }

    /// Cancel every in-flight run and wait for them to record their
    /// final state.
    pub async fn shutdown(&self) {
        tracing::info!("Cancelling in-flight generation jobs");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn run(&self, job_id: JobId, prompt: String, options: SubmitOptions, cancel: CancellationToken) {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunError::Cancelled(if self.shutdown.is_cancelled() {
                CANCELLED_BY_SHUTDOWN
            } else {
                CANCELLED_BY_REQUEST
            })),
            result = self.execute(job_id, &prompt, &options) => result,
        };

        let update = match outcome {
            Ok(update) => update,
            Err(e) => {
                tracing::error!(job_id = %job_id, status = %e.status(), error = %e, "Job run failed");
                JobUpdate::ended(e.status(), e.to_string())
            }
        };
        self.finish(job_id, update).await;
        self.runs.lock().await.remove(&job_id);
    }

    /// Record the run's final update.
    ///
    /// When the job already ended another way (cancelled while the
    /// artifact was being saved), the saved artifact is removed so it
    /// cannot later be mistaken for a completed job.
    async fn finish(&self, job_id: JobId, update: JobUpdate) {
        let artifact = update.artifact_path.clone();
        if self.store.apply(job_id, update).await.is_some() {
            return;
        }
        let Some(path) = artifact else {
            return;
        };
        tracing::warn!(job_id = %job_id, path = %path.display(), "Job already finished, discarding artifact");
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(job_id = %job_id, path = %path.display(), error = %e, "Failed to remove discarded artifact");
        }
    }

    async fn execute(
        &self,
        job_id: JobId,
        prompt: &str,
        options: &SubmitOptions,
    ) -> Result<JobUpdate, RunError> {
        self.store
            .apply(job_id, JobUpdate::processing(0, "Initializing video generation"))
            .await;

        let intensity = style_intensity_or_default(options.style_intensity);
        let outcome = tokio::time::timeout(
            self.config.enhancement_timeout,
            self.enhancer.enhance(prompt, intensity),
        )
        .await
        .unwrap_or_else(|_| EnhanceOutcome::Fallback {
            reason: "timed out".to_string(),
        });
        if let EnhanceOutcome::Fallback { reason } = &outcome {
            tracing::warn!(job_id = %job_id, error = %reason, "Prompt enhancement failed, using original prompt");
        }
        let prompt = outcome.into_prompt(prompt);

        self.store
            .apply(
                job_id,
                JobUpdate::progress(SUBMIT_PROGRESS, "Submitting prompt to generation backend"),
            )
            .await;

        let request = GenerationRequest {
            prompt,
            params: BackendParams::from_knobs(options.quality.as_deref(), options.style_intensity),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_progress(self.store.clone(), job_id, rx));

        let deadline = self.config.generation_timeout;
        let result = tokio::time::timeout(deadline, self.client.generate(request, tx)).await;
        // The sender is gone with the call; wait for queued updates to land.
        let _ = forwarder.await;

        let output = match result {
            Ok(output) => output?,
            Err(_) => return Err(RunError::TimedOut(deadline)),
        };

        self.store
            .apply(
                job_id,
                JobUpdate::progress(DOWNLOAD_PROGRESS, "Video generated, downloading artifact"),
            )
            .await;

        let path = self
            .fetcher
            .fetch(&output.artifact_url, job_id, &output.content_type)
            .await?;

        Ok(JobUpdate::completed(path, artifact_url(job_id))
            .with_seed(output.seed)
            .with_metadata(output.metadata))
    }
}

/// Apply queue updates to the job in the order they arrive.
async fn forward_progress(
    store: Arc<JobStore>,
    job_id: JobId,
    mut rx: mpsc::UnboundedReceiver<QueueUpdate>,
) {
    while let Some(update) = rx.recv().await {
        store
            .apply_with(job_id, |job| {
                let next = if update.is_activity() {
                    progress::normalize(job.progress, update.progress_text())
                } else {
                    job.progress
                };
                Some(JobUpdate::progress(next, update.status_line()))
            })
            .await;
    }
}
