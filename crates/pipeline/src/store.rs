//! The job registry.
//!
//! [`JobStore`] holds the authoritative in-memory record of every job the
//! process has seen. Status transitions are written through to SQLite
//! when a pool is configured; progress ticks stay in memory.
//!
//! A lookup that misses memory falls back, in order, to: a terminal
//! persisted record; an artifact file named after the job under the
//! output root; a persisted record whose run died with the previous
//! process (reported as failed). Anything recovered is cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use genesis_core::artifact::{artifact_path, artifact_url, ARTIFACT_EXTENSIONS};
use genesis_core::job::{Job, JobStatus, JobUpdate, MergeOutcome};
use genesis_core::types::JobId;
use genesis_db::models::job::JobRow;
use genesis_db::repositories::JobRepo;
use genesis_db::DbPool;
use tokio::sync::RwLock;

use crate::error::JobError;

/// Error recorded on jobs whose run was lost to a restart.
pub const INTERRUPTED_ERROR: &str = "interrupted by server restart";

/// In-memory job table with durable fallback.
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    output_dir: PathBuf,
    db: Option<DbPool>,
}

impl JobStore {
    pub fn new(output_dir: impl Into<PathBuf>, db: Option<DbPool>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            output_dir: output_dir.into(),
            db,
        }
    }

    /// Fixed root that artifacts are written to and searched under.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Register a new job and persist it.
    pub async fn insert(&self, job: Job) {
        let snapshot = job.clone();
        self.jobs.write().await.insert(job.job_id, job);
        self.persist(&snapshot).await;
    }

    /// Merge `update` into a job held in memory.
    ///
    /// Returns the resulting snapshot, or `None` when the job is unknown
    /// or already terminal. Updates that carry a status are persisted.
    pub async fn apply(&self, job_id: JobId, update: JobUpdate) -> Option<Job> {
        let persist = update.status.is_some();
        let snapshot = self.apply_with(job_id, |_| Some(update)).await?;
        if persist {
            self.persist(&snapshot).await;
        }
        Some(snapshot)
    }

    /// Merge an update computed from the current record, atomically.
    ///
    /// Used for progress ticks, which derive the next value from the last
    /// one. Not persisted.
    pub async fn apply_with<F>(&self, job_id: JobId, build: F) -> Option<Job>
    where
        F: FnOnce(&Job) -> Option<JobUpdate>,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id)?;
        let update = build(job)?;
        match job.merge(update, Utc::now()) {
            MergeOutcome::Applied => {
                tracing::info!(
                    job_id = %job_id,
                    status = %job.status,
                    progress = job.progress,
                    message = %job.message,
                    "Job updated",
                );
                Some(job.clone())
            }
            MergeOutcome::Ignored => {
                tracing::debug!(job_id = %job_id, status = %job.status, "Update ignored for finished job");
                None
            }
        }
    }

    /// In-memory snapshot only.
    pub async fn get(&self, job_id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Snapshot of a job, recovering it from durable storage on a miss.
    pub async fn lookup(&self, job_id: JobId) -> Result<Job, JobError> {
        if let Some(job) = self.get(job_id).await {
            return Ok(job);
        }

        let job = self.recover(job_id).await.ok_or(JobError::NotFound(job_id))?;
        let mut jobs = self.jobs.write().await;
        Ok(jobs.entry(job_id).or_insert(job).clone())
    }

    async fn recover(&self, job_id: JobId) -> Option<Job> {
        let stored = self.load_persisted(job_id).await;

        if let Some(job) = stored.as_ref().filter(|j| j.status.is_terminal()) {
            tracing::info!(job_id = %job_id, status = %job.status, "Job recovered from database");
            return stored;
        }

        if let Some(job) = self.reconstruct_from_disk(job_id).await {
            tracing::info!(
                job_id = %job_id,
                path = %job.artifact_path.as_deref().unwrap_or(Path::new("")).display(),
                "Job reconstructed from artifact on disk",
            );
            self.persist(&job).await;
            return Some(job);
        }

        match stored {
            Some(mut job) => {
                job.merge(JobUpdate::ended(JobStatus::Failed, INTERRUPTED_ERROR), Utc::now());
                tracing::warn!(job_id = %job_id, "Persisted job was interrupted by a restart");
                self.persist(&job).await;
                Some(job)
            }
            None => {
                tracing::warn!(job_id = %job_id, "Job not found in memory, database or on disk");
                None
            }
        }
    }

    /// Read the persisted record, if any. Read failures and unreadable
    /// rows are logged and count as "no record".
    async fn load_persisted(&self, job_id: JobId) -> Option<Job> {
        let pool = self.db.as_ref()?;
        let row = match JobRepo::find_by_id(pool, job_id).await {
            Ok(row) => row?,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to read persisted job");
                return None;
            }
        };
        match Job::try_from(row) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Discarding unreadable persisted job");
                None
            }
        }
    }

    /// Search the output root for `{job_id}.{ext}` and synthesize a
    /// completed record from the first match.
    pub async fn reconstruct_from_disk(&self, job_id: JobId) -> Option<Job> {
        for ext in ARTIFACT_EXTENSIONS {
            let path = artifact_path(&self.output_dir, job_id, ext);
            let Ok(meta) = tokio::fs::metadata(&path).await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            let modified: DateTime<Utc> = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            let mut job = Job::queued(job_id, modified);
            job.merge(
                JobUpdate {
                    message: Some("Video found from a previous session".to_string()),
                    ..JobUpdate::completed(path, artifact_url(job_id))
                },
                modified,
            );
            return Some(job);
        }
        None
    }

    /// Write the record through to the database. Failures are logged only.
    async fn persist(&self, job: &Job) {
        let Some(pool) = &self.db else {
            return;
        };
        if let Err(e) = JobRepo::upsert(pool, &JobRow::from(job)).await {
            tracing::error!(job_id = %job.job_id, error = %e, "Failed to persist job");
        }
    }
}
