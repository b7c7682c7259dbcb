//! Handlers for `/api/job/{job_id}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use genesis_core::job::Job;

use super::job_id_param;
use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/job/{job_id}/status
///
/// Returns the job snapshot, recovering it from storage if the process
/// no longer holds it.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<Job>> {
    let job_id = job_id_param(&job_id)?;
    let job = state.orchestrator.get_status(job_id).await?;
    Ok(Json(job))
}

/// POST /api/job/{job_id}/cancel
///
/// Cancels a queued or processing job. 409 when it already finished.
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<(StatusCode, Json<Job>)> {
    let job_id = job_id_param(&job_id)?;
    let job = state.orchestrator.cancel(job_id).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}
