pub mod health;
pub mod models;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;

use crate::handlers;
use crate::middleware::rate_limit;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /health                         service health
/// /models                         model catalog
/// /generate/text-to-video         submit a job (POST, rate limited)
/// /job/{job_id}/status            job snapshot
/// /job/{job_id}/cancel            cancel a running job (POST)
/// /download/{job_id}              stream the artifact
/// ```
///
/// Unknown paths under `/api` answer with a JSON 404.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let generate = Router::new()
        .route(
            "/generate/text-to-video",
            post(handlers::generation::text_to_video),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_generation,
        ));

    Router::new()
        .merge(health::router())
        .merge(models::router())
        .merge(generate)
        .route("/job/{job_id}/status", get(handlers::jobs::get_status))
        .route("/job/{job_id}/cancel", post(handlers::jobs::cancel))
        .route("/download/{job_id}", get(handlers::downloads::download))
        .fallback(api_not_found)
}

async fn api_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "code": "NOT_FOUND",
        })),
    )
}
