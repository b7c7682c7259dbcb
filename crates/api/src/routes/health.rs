use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    /// Generation backend credentials are configured.
    pub fal_ai_available: bool,
    /// Prompt enhancement credentials are configured.
    pub openai_available: bool,
    /// The job metadata database answers queries.
    pub database: bool,
}

/// GET /api/health -- service availability.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.pool {
        Some(pool) => genesis_db::health_check(pool).await.is_ok(),
        None => false,
    };

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        services: ServiceHealth {
            fal_ai_available: state.orchestrator.generation_available(),
            openai_available: state.orchestrator.enhancement_available(),
            database,
        },
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
