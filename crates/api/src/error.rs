use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use genesis_pipeline::JobError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent
/// `{"error": ..., "code": ...}` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A job query or command failed.
    #[error(transparent)]
    Job(#[from] JobError),

    /// The submitted prompt failed validation; one entry per problem.
    #[error("Invalid prompt: {}", .0.join("; "))]
    InvalidPrompt(Vec<String>),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The client exceeded its generation quota.
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Seconds until the current window resets.
        retry_after_secs: u64,
    },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Job(job) => match job {
                JobError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", "Job not found".to_string())
                }
                JobError::NotReady(_) => (
                    StatusCode::NOT_FOUND,
                    "NOT_READY",
                    "Video not found or not ready.".to_string(),
                ),
                JobError::ArtifactMissing(_) => (
                    StatusCode::NOT_FOUND,
                    "ARTIFACT_MISSING",
                    "Video not found or not ready.".to_string(),
                ),
                JobError::AlreadyTerminal(_) => {
                    (StatusCode::CONFLICT, "CONFLICT", "Job has already finished".to_string())
                }
            },

            AppError::InvalidPrompt(details) => {
                let body = json!({
                    "error": "Invalid prompt",
                    "code": "VALIDATION_ERROR",
                    "details": details,
                });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            AppError::RateLimited { retry_after_secs } => {
                let body = json!({
                    "error": "Too many generation requests, please try again later.",
                    "code": "RATE_LIMITED",
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
                return response;
            }

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
