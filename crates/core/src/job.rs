//! The job record and its merge rules.
//!
//! A [`Job`] is only ever mutated through [`Job::merge`], which overlays a
//! [`JobUpdate`] onto the record. The merge enforces the lifecycle
//! invariants in one place:
//!
//! - status moves forward only (`queued -> processing -> terminal`);
//! - a terminal record is frozen, later updates are ignored;
//! - progress never decreases and is pinned at 100 on completion;
//! - `updated_at` is refreshed on every applied update.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

/// Upper bound of the progress scale.
pub const PROGRESS_MAX: u8 = 100;

/// Lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobStatus {
    /// Wire/database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses are immutable once reached.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "timed_out" => Ok(Self::TimedOut),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!("Unknown job status '{other}'"))),
        }
    }
}

/// One submitted generation request and its tracked lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    /// 0-100, monotonic while the job is running.
    pub progress: u8,
    /// Latest human-readable status line.
    pub message: String,
    /// Causing diagnostic, present on failed/timed out/cancelled jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Local durable path of the artifact (completed jobs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    /// Public retrieval handle for the artifact (completed jobs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Opaque backend-reported fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// A freshly submitted job.
    pub fn queued(job_id: JobId, now: Timestamp) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued for generation".to_string(),
            error: None,
            artifact_path: None,
            artifact_url: None,
            seed: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overlay `update` onto this record.
    ///
    /// Fields absent from the update are preserved. Returns
    /// [`MergeOutcome::Ignored`] without touching the record when the job
    /// is already terminal.
    pub fn merge(&mut self, update: JobUpdate, now: Timestamp) -> MergeOutcome {
        if self.status.is_terminal() {
            return MergeOutcome::Ignored;
        }

        if let Some(status) = update.status {
            if status.rank() >= self.status.rank() {
                self.status = status;
            }
        }
        if let Some(progress) = update.progress {
            self.progress = self.progress.max(progress.min(PROGRESS_MAX));
        }
        if self.status == JobStatus::Completed {
            self.progress = PROGRESS_MAX;
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(path) = update.artifact_path {
            self.artifact_path = Some(path);
        }
        if let Some(url) = update.artifact_url {
            self.artifact_url = Some(url);
        }
        if let Some(seed) = update.seed {
            self.seed = Some(seed);
        }
        if let Some(metadata) = update.metadata {
            self.metadata = Some(metadata);
        }
        self.updated_at = now;

        MergeOutcome::Applied
    }
}

/// Result of [`Job::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// The job was already terminal; nothing changed.
    Ignored,
}

/// Merge-style partial update. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub artifact_path: Option<PathBuf>,
    pub artifact_url: Option<String>,
    pub seed: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

impl JobUpdate {
    /// A progress tick with a new status line.
    pub fn progress(progress: u8, message: impl Into<String>) -> Self {
        Self {
            progress: Some(progress),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Enter (or stay in) the processing state.
    pub fn processing(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            ..Self::progress(progress, message)
        }
    }

    /// Terminal success with the persisted artifact.
    pub fn completed(artifact_path: PathBuf, artifact_url: String) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(PROGRESS_MAX),
            message: Some("Video generation completed successfully".to_string()),
            artifact_path: Some(artifact_path),
            artifact_url: Some(artifact_url),
            ..Default::default()
        }
    }

    /// Terminal non-success. `status` must be one of the failure statuses.
    pub fn ended(status: JobStatus, error: impl Into<String>) -> Self {
        let error = error.into();
        let message = match status {
            JobStatus::TimedOut => format!("Generation timed out: {error}"),
            JobStatus::Cancelled => format!("Generation cancelled: {error}"),
            _ => format!("Generation failed: {error}"),
        };
        Self {
            status: Some(status),
            message: Some(message),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: Option<i64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
