pub mod downloads;
pub mod generation;
pub mod jobs;

use genesis_core::types::{parse_job_id, JobId};

use crate::error::{AppError, AppResult};

/// Parse a `{job_id}` path segment, rejecting anything that is not a UUID.
pub(crate) fn job_id_param(raw: &str) -> AppResult<JobId> {
    parse_job_id(raw).ok_or_else(|| AppError::BadRequest("Invalid Job ID format".to_string()))
}
