use std::sync::Arc;

use genesis_pipeline::JobOrchestrator;

use crate::config::ServerConfig;
use crate::middleware::rate_limit::RateLimiter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc` or is a handle.
#[derive(Clone)]
pub struct AppState {
    /// Durable job metadata, when configured.
    pub pool: Option<genesis_db::DbPool>,
    pub config: Arc<ServerConfig>,
    /// Owns job lifecycles and answers status/artifact queries.
    pub orchestrator: JobOrchestrator,
    /// Per-IP quota on generation requests.
    pub rate_limiter: Arc<RateLimiter>,
}
