//! Handler for `GET /api/download/{job_id}`.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use genesis_core::artifact::{content_type_for_extension, download_file_name, extension_of};
use genesis_pipeline::JobError;
use tokio_util::io::ReaderStream;

use super::job_id_param;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/download/{job_id}
///
/// Streams the artifact of a completed job as an attachment.
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Response> {
    let job_id = job_id_param(&job_id)?;
    let path = state.orchestrator.get_artifact_path(job_id).await?;
    let extension = extension_of(&path);

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::error!(job_id = %job_id, path = %path.display(), error = %e, "Failed to open artifact");
        AppError::Job(JobError::ArtifactMissing(job_id))
    })?;
    let file_size = file.metadata().await.ok().map(|m| m.len());

    tracing::info!(job_id = %job_id, path = %path.display(), "Streaming artifact");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for_extension(&extension))
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                download_file_name(job_id, &extension)
            ),
        );
    if let Some(size) = file_size {
        builder = builder.header(header::CONTENT_LENGTH, size);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
