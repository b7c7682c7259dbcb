//! Row model for the `jobs` table and its conversion to the domain [`Job`].

use std::path::PathBuf;

use genesis_core::error::CoreError;
use genesis_core::job::{Job, JobStatus};
use genesis_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct JobRow {
    pub id: String,
    pub status: String,
    pub progress: i64,
    pub message: String,
    pub error: Option<String>,
    pub artifact_path: Option<String>,
    pub artifact_url: Option<String>,
    pub seed: Option<i64>,
    /// Backend metadata serialized as JSON text.
    pub metadata: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.job_id.to_string(),
            status: job.status.as_str().to_string(),
            progress: i64::from(job.progress),
            message: job.message.clone(),
            error: job.error.clone(),
            artifact_path: job
                .artifact_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            artifact_url: job.artifact_url.clone(),
            seed: job.seed,
            metadata: job.metadata.as_ref().map(|m| m.to_string()),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

impl TryFrom<JobRow> for Job {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let job_id = genesis_core::types::parse_job_id(&row.id)
            .ok_or_else(|| CoreError::Internal(format!("Stored job id '{}' is not a UUID", row.id)))?;
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|_| CoreError::Internal(format!("Stored job status '{}' is unknown", row.status)))?;
        let metadata = match row.metadata {
            Some(text) => match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Discarding unreadable job metadata");
                    None
                }
            },
            None => None,
        };

        Ok(Job {
            job_id,
            status,
            progress: row.progress.clamp(0, 100) as u8,
            message: row.message,
            error: row.error,
            artifact_path: row.artifact_path.map(PathBuf::from),
            artifact_url: row.artifact_url,
            seed: row.seed,
            metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
